//! System endpoints: health check and filter catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::{DateField, Granularity, Preset};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Accepted values of the enumerated filter parameters.
#[derive(Debug, Serialize, ToSchema)]
struct FilterCatalog {
    presets: Vec<CatalogEntry>,
    date_fields: Vec<CatalogEntry>,
    granularities: Vec<CatalogEntry>,
}

/// One accepted value.
#[derive(Debug, Serialize, ToSchema)]
struct CatalogEntry {
    value: &'static str,
    description: &'static str,
    default: bool,
}

fn preset_description(preset: Preset) -> &'static str {
    match preset {
        Preset::YearToDate => "January 1 of the selected year up to now",
        Preset::Last30Days => "The 30 calendar days ending now",
        Preset::QuarterToDate => "First day of the current quarter up to now",
        Preset::Custom => "Caller-supplied start_date and end_date within the year",
    }
}

fn date_field_description(field: DateField) -> &'static str {
    match field {
        DateField::ActualReturn => "Actual return, falling back to the scheduled end",
        DateField::EndDate => "Scheduled end",
        DateField::ExpectedReturn => "Expected return, falling back to the scheduled end",
        DateField::StartDate => "Pickup",
    }
}

/// `GET /config/presets` — List accepted presets, date fields and granularities.
#[utoipa::path(
    get,
    path = "/config/presets",
    tag = "System",
    summary = "List filter values",
    description = "Returns every date preset, booking date field and timeline granularity the dashboard accepts, flagging the defaults.",
    responses(
        (status = 200, description = "Filter catalog", body = FilterCatalog),
    )
)]
pub async fn presets_handler() -> impl IntoResponse {
    let catalog = FilterCatalog {
        presets: Preset::ALL
            .into_iter()
            .map(|p| CatalogEntry {
                value: p.as_str(),
                description: preset_description(p),
                default: p == Preset::default(),
            })
            .collect(),
        date_fields: DateField::ALL
            .into_iter()
            .map(|f| CatalogEntry {
                value: f.as_str(),
                description: date_field_description(f),
                default: f == DateField::default(),
            })
            .collect(),
        granularities: [Granularity::Day, Granularity::Hour]
            .into_iter()
            .map(|g| CatalogEntry {
                value: g.as_str(),
                description: match g {
                    Granularity::Day => "One timeline sample per day, at most 30",
                    Granularity::Hour => "One timeline sample per hour over the last 24 hours",
                },
                default: g == Granularity::default(),
            })
            .collect(),
    };
    (StatusCode::OK, Json(catalog))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/presets", get(presets_handler))
}
