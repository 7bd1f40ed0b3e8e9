//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::DashboardService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Report engine behind every dashboard endpoint.
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Wraps a dashboard service for sharing across handlers.
    #[must_use]
    pub fn new(dashboard: DashboardService) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
        }
    }
}
