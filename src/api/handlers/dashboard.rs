//! Dashboard report handlers.
//!
//! Every handler takes the raw query string so that repeated and
//! bracketed keys (`status[]=a&status[]=b`) survive until the filter
//! normalizer sees them.

use axum::extract::{RawQuery, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use utoipa::IntoParams;

use crate::api::tenant::AuthenticatedTenant;
use crate::app_state::AppState;
use crate::domain::report::{
    ActivityFeedReport, FleetSnapshotReport, FleetUtilizationReport, MonthlySalesReport,
    RevenueByClassReport, SummaryReport, TopVehiclesReport, UpcomingBookingsReport,
};
use crate::error::{AnalyticsError, ErrorResponse};

/// Query parameters shared by the dashboard endpoints.
///
/// Every parameter is optional; invalid values fall back to their default
/// instead of failing the request.
#[derive(Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// Calendar year, 1970..=9999. Defaults to the current year in `timezone`.
    pub year: Option<i32>,
    /// Narrow to one owned company.
    pub company_id: Option<i64>,
    /// Narrow to one car of an owned company.
    pub car_id: Option<i64>,
    /// Booking statuses, comma separated or repeated. `cancelled` is ignored.
    pub status: Option<String>,
    /// `actual_return` (default), `end_date`, `expected_return` or `start_date`.
    pub date_field: Option<String>,
    /// Count settled payments instead of booking amounts.
    pub use_payments: Option<bool>,
    /// `year_to_date` (default), `last_30_days`, `quarter_to_date` or `custom`.
    pub preset: Option<String>,
    /// `YYYY-MM-DD`, with `preset=custom`.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, with `preset=custom`.
    pub end_date: Option<String>,
    /// Add a previous-period comparison.
    pub include_trend: Option<bool>,
    /// Add the previous months to the monthly series.
    pub include_previous: Option<bool>,
    /// Three-letter currency override.
    pub currency: Option<String>,
    /// IANA zone the ranges are resolved in.
    pub timezone: Option<String>,
    /// Utilization timeline step: `day` (default) or `hour`.
    pub granularity: Option<String>,
    /// First year of the monthly series.
    pub start_year: Option<i32>,
    /// Last year of the monthly series, at most ten years after `start_year`.
    pub end_year: Option<i32>,
    /// Row limit for list reports.
    pub limit: Option<u32>,
}

/// `GET /dashboard/summary` — Headline revenue and booking KPIs.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    tag = "Dashboard",
    summary = "Revenue and booking summary",
    description = "Revenue, booking count and average booking value over the resolved range, optionally compared with the previous equal-length window.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Summary report", body = SummaryReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<SummaryReport>, AnalyticsError> {
    let now = Utc::now();
    let filter = state.dashboard.normalize(query.as_deref(), now);
    Ok(Json(state.dashboard.summary(tenant, &filter, now).await?))
}

/// `GET /dashboard/fleet-utilization` — Fleet state at the end of the range.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/fleet-utilization",
    tag = "Dashboard",
    summary = "Fleet utilization",
    description = "Active, available and unavailable cars at the end of the resolved range, per-class utilization and a sampled timeline.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Fleet utilization report", body = FleetUtilizationReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn fleet_utilization(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<FleetUtilizationReport>, AnalyticsError> {
    let now = Utc::now();
    let filter = state.dashboard.normalize(query.as_deref(), now);
    Ok(Json(
        state.dashboard.fleet_utilization(tenant, &filter, now).await?,
    ))
}

/// `GET /dashboard/monthly-sales` — Revenue per calendar month.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/monthly-sales",
    tag = "Dashboard",
    summary = "Monthly sales",
    description = "Zero-filled monthly revenue and returned bookings over `start_year..=end_year`.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Monthly sales report", body = MonthlySalesReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn monthly_sales(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<MonthlySalesReport>, AnalyticsError> {
    let filter = state.dashboard.normalize(query.as_deref(), Utc::now());
    Ok(Json(state.dashboard.monthly_sales(tenant, &filter).await?))
}

/// `GET /dashboard/revenue-by-class` — Revenue split by vehicle class.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/revenue-by-class",
    tag = "Dashboard",
    summary = "Revenue by vehicle class",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Revenue by class report", body = RevenueByClassReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn revenue_by_class(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<RevenueByClassReport>, AnalyticsError> {
    let now = Utc::now();
    let filter = state.dashboard.normalize(query.as_deref(), now);
    Ok(Json(
        state.dashboard.revenue_by_class(tenant, &filter, now).await?,
    ))
}

/// `GET /dashboard/top-vehicles` — Best-earning cars.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/top-vehicles",
    tag = "Dashboard",
    summary = "Top vehicles by revenue",
    description = "Cars with revenue or bookings in the resolved range, best first. `limit` defaults to 5, at most 50.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Top vehicles report", body = TopVehiclesReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn top_vehicles(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<TopVehiclesReport>, AnalyticsError> {
    let now = Utc::now();
    let filter = state.dashboard.normalize(query.as_deref(), now);
    Ok(Json(state.dashboard.top_vehicles(tenant, &filter, now).await?))
}

/// `GET /dashboard/upcoming-bookings` — Reservations about to start.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/upcoming-bookings",
    tag = "Dashboard",
    summary = "Upcoming bookings",
    description = "Reserved bookings starting from now, soonest first. `limit` defaults to 10, at most 50.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Upcoming bookings report", body = UpcomingBookingsReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn upcoming_bookings(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<UpcomingBookingsReport>, AnalyticsError> {
    let now = Utc::now();
    let filter = state.dashboard.normalize(query.as_deref(), now);
    Ok(Json(
        state.dashboard.upcoming_bookings(tenant, &filter, now).await?,
    ))
}

/// `GET /dashboard/activity-feed` — Latest dashboard events.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company,
/// or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/activity-feed",
    tag = "Dashboard",
    summary = "Activity feed",
    description = "Newest events of the companies in scope. `limit` defaults to 20, at most 100.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Activity feed", body = ActivityFeedReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company outside the tenant", body = ErrorResponse),
    )
)]
pub async fn activity_feed(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<ActivityFeedReport>, AnalyticsError> {
    let filter = state.dashboard.normalize(query.as_deref(), Utc::now());
    Ok(Json(state.dashboard.activity_feed(tenant, &filter).await?))
}

/// `GET /dashboard/fleet-snapshot` — Latest fleet figures.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on a missing tenant, an out-of-scope company
/// or car, or a storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/fleet-snapshot",
    tag = "Dashboard",
    summary = "Fleet snapshot",
    description = "Latest precomputed daily fleet metrics, or live figures when a company has none.",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Fleet snapshot", body = FleetSnapshotReport),
        (status = 401, description = "Missing tenant", body = ErrorResponse),
        (status = 403, description = "Company or car outside the tenant", body = ErrorResponse),
    )
)]
pub async fn fleet_snapshot(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    RawQuery(query): RawQuery,
) -> Result<Json<FleetSnapshotReport>, AnalyticsError> {
    let now = Utc::now();
    let filter = state.dashboard.normalize(query.as_deref(), now);
    Ok(Json(
        state.dashboard.fleet_snapshot(tenant, &filter, now).await?,
    ))
}

/// Dashboard routes, relative to `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/summary", get(summary))
        .route("/dashboard/fleet-utilization", get(fleet_utilization))
        .route("/dashboard/monthly-sales", get(monthly_sales))
        .route("/dashboard/revenue-by-class", get(revenue_by_class))
        .route("/dashboard/top-vehicles", get(top_vehicles))
        .route("/dashboard/upcoming-bookings", get(upcoming_bookings))
        .route("/dashboard/activity-feed", get(activity_feed))
        .route("/dashboard/fleet-snapshot", get(fleet_snapshot))
}
