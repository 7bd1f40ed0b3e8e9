//! OpenAPI document for the dashboard and system endpoints.

use utoipa::OpenApi;

use super::handlers::{dashboard, system};
use crate::domain::records::DashboardEvent;
use crate::domain::report::{
    ActivityFeedReport, FleetSnapshotReport, FleetUtilizationReport, MonthlySalesReport,
    RevenueByClassReport, SummaryReport, TopVehiclesReport, UpcomingBookingsReport,
};
use crate::error::ErrorResponse;

/// Generated API description, served by Swagger UI when the `swagger-ui`
/// feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "tenant-analytics",
        description = "Per-tenant revenue, booking and fleet analytics for the rental dashboard."
    ),
    paths(
        dashboard::summary,
        dashboard::fleet_utilization,
        dashboard::monthly_sales,
        dashboard::revenue_by_class,
        dashboard::top_vehicles,
        dashboard::upcoming_bookings,
        dashboard::activity_feed,
        dashboard::fleet_snapshot,
        system::health_handler,
        system::presets_handler,
    ),
    components(schemas(
        SummaryReport,
        FleetUtilizationReport,
        MonthlySalesReport,
        RevenueByClassReport,
        TopVehiclesReport,
        UpcomingBookingsReport,
        ActivityFeedReport,
        FleetSnapshotReport,
        DashboardEvent,
        ErrorResponse,
    )),
    tags(
        (name = "Dashboard", description = "Tenant-scoped dashboard reports"),
        (name = "System", description = "Health and filter catalog"),
    )
)]
pub struct ApiDoc;
