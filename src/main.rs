//! tenant-analytics server entry point.
//!
//! Starts the Axum HTTP server with the dashboard and system endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tenant_analytics::api;
use tenant_analytics::app_state::AppState;
use tenant_analytics::cache::{AnalyticsCache, MokaCache, NoopCache};
use tenant_analytics::config::AnalyticsConfig;
use tenant_analytics::persistence::PostgresStore;
use tenant_analytics::service::{DashboardService, DashboardSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AnalyticsConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting tenant-analytics");

    // Build persistence layer
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect_lazy(&config.database_url)?;
    let store = Arc::new(PostgresStore::new(pool));

    // Build cache
    let ttl = Duration::from_secs(config.cache_ttl_secs);
    let cache: Arc<dyn AnalyticsCache> = if config.cache_enabled {
        Arc::new(MokaCache::new(config.cache_max_entries, ttl))
    } else {
        tracing::info!("report cache disabled");
        Arc::new(NoopCache::new(ttl))
    };

    // Build service layer
    let dashboard = DashboardService::new(
        store,
        cache,
        DashboardSettings {
            default_timezone: config.default_timezone,
            default_currency: config.default_currency.clone(),
        },
    );
    let app_state = AppState::new(dashboard);

    // Build router
    let app = Router::new().merge(api::build_router());
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::GATEWAY_TIMEOUT,
                    Duration::from_secs(config.request_timeout_secs),
                )),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
