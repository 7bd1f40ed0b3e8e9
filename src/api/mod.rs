//! REST API layer: route handlers, tenant extraction and router composition.
//!
//! Dashboard endpoints are mounted under `/api/v1`; system endpoints sit
//! at the root.

pub mod handlers;
pub mod openapi;
pub mod tenant;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
