//! Report payloads returned by the dashboard endpoints.
//!
//! Money is carried as [`rust_decimal::Decimal`] while aggregating and only
//! converted to `f64` (two decimals) when a report is assembled. Reports
//! round-trip through JSON so they can be served from the cache.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{BookingId, CarId, CompanyId};
use super::range::DateRange;
use super::records::DashboardEvent;
use super::trend::MetricDelta;
use super::utilization::{ClassUtilization, FleetCounts, UtilizationRate};

/// The report an endpoint produces; part of every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Headline revenue and booking KPIs.
    Summary,
    /// Active/available/unavailable cars with a timeline.
    FleetUtilization,
    /// Revenue and bookings per calendar month.
    MonthlySales,
    /// Revenue split by vehicle class.
    RevenueByClass,
    /// Best-earning cars.
    TopVehicles,
    /// Reservations about to start.
    UpcomingBookings,
    /// Latest dashboard events.
    ActivityFeed,
    /// Latest fleet figures.
    FleetSnapshot,
}

impl ReportKind {
    /// Stable name used in cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::FleetUtilization => "fleet-utilization",
            Self::MonthlySales => "monthly-sales",
            Self::RevenueByClass => "revenue-by-class",
            Self::TopVehicles => "top-vehicles",
            Self::UpcomingBookings => "upcoming-bookings",
            Self::ActivityFeed => "activity-feed",
            Self::FleetSnapshot => "fleet-snapshot",
        }
    }
}

/// Where revenue figures come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    /// `SUM(bookings.total_amount)`.
    Bookings,
    /// Sum of settled payments.
    Payments,
}

impl RevenueSource {
    /// Maps the `use_payments` flag.
    #[must_use]
    pub const fn from_flag(use_payments: bool) -> Self {
        if use_payments {
            Self::Payments
        } else {
            Self::Bookings
        }
    }
}

// ── Summary ────────────────────────────────────────────────────────────

/// `GET /dashboard/summary` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    /// Requested period.
    pub period: SummaryPeriod,
    /// Window actually aggregated.
    pub resolved_range: DateRange,
    /// Headline KPIs.
    pub totals: SummaryTotals,
    /// How the figures were produced.
    pub meta: SummaryMeta,
    /// Previous-period comparison, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<SummaryTrend>,
}

/// Requested period as normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPeriod {
    /// Calendar year.
    pub year: i32,
    /// Preset name.
    pub preset: String,
    /// IANA zone of the wall-clock range.
    pub timezone: String,
}

/// Headline KPIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    /// Revenue over the window.
    pub annual_revenue: f64,
    /// Bookings placed in the window.
    pub bookings_ytd: i64,
    /// Revenue per booking.
    pub average_booking_value: f64,
}

/// Provenance of the summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMeta {
    /// Reported currency.
    pub currency: String,
    /// Booking date used to place bookings in the window.
    pub date_field: String,
    /// Revenue source.
    pub revenue_source: RevenueSource,
    /// Booking statuses counted.
    pub statuses: Vec<String>,
    /// Companies aggregated.
    pub company_ids: Vec<CompanyId>,
    /// Car the summary is narrowed to.
    pub car_id: Option<CarId>,
    /// When the figures were computed.
    pub generated_at: DateTime<Utc>,
}

/// Summary comparison against the equal-length previous window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTrend {
    /// Previous window, `null` when none exists.
    pub previous_range: Option<DateRange>,
    /// KPIs of the previous window.
    pub previous_totals: Option<SummaryTotals>,
    /// Headline revenue delta in percent.
    pub revenue_change_percent: Option<f64>,
    /// Headline bookings delta in percent.
    pub bookings_change_percent: Option<f64>,
    /// Per-metric deltas; percent is `null` on a zero baseline.
    pub metrics: Option<SummaryTrendMetrics>,
}

/// Per-metric summary deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTrendMetrics {
    /// Revenue delta.
    pub revenue: MetricDelta,
    /// Booking count delta.
    pub bookings: MetricDelta,
    /// Average booking value delta.
    pub average_booking_value: MetricDelta,
}

// ── Fleet utilization ──────────────────────────────────────────────────

/// `GET /dashboard/fleet-utilization` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FleetUtilizationReport {
    /// Resolved window; utilization is measured at its end.
    pub range: DateRange,
    /// Instant the fleet was measured at.
    pub reference_at: NaiveDateTime,
    /// Headcount by state.
    pub totals: FleetCounts,
    /// Fleet-wide utilization.
    pub utilization: UtilizationRate,
    /// Per-class utilization.
    pub breakdown: Vec<ClassUtilization>,
    /// Cache freshness hints for polling clients.
    pub refresh: RefreshInfo,
    /// Utilization sampled up to the reference instant.
    pub timeline: Vec<TimelinePoint>,
    /// Comparison with the previous window's end, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<UtilizationTrend>,
}

/// When a report was built and when a fresh one will be available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RefreshInfo {
    /// Computation time.
    pub generated_at: DateTime<Utc>,
    /// Cache lifetime.
    pub ttl_seconds: u64,
    /// `generated_at + ttl_seconds`.
    pub next_refresh_at: DateTime<Utc>,
    /// Timeline step.
    pub granularity: String,
}

/// One utilization sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimelinePoint {
    /// Sample instant.
    pub at: NaiveDateTime,
    /// Active cars.
    pub active: i64,
    /// Cars in scope.
    pub fleet_size: i64,
    /// `active / fleet_size`, four decimals.
    pub rate: f64,
}

/// Utilization comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UtilizationTrend {
    /// Previous window, `null` when none exists.
    pub previous_range: Option<DateRange>,
    /// Active cars at the previous window's end.
    pub previous_active: Option<i64>,
    /// Utilization at the previous window's end.
    pub previous_rate: Option<f64>,
    /// Percent change with one decimal; `null` on a zero baseline.
    pub change_percent: Option<f64>,
}

// ── Monthly sales ──────────────────────────────────────────────────────

/// `GET /dashboard/monthly-sales` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlySalesReport {
    /// Whole-year window covered by `series`.
    pub range: DateRange,
    /// Reported currency.
    pub currency: String,
    /// Revenue source.
    pub revenue_source: RevenueSource,
    /// One point per calendar month, zero-filled.
    pub series: Vec<MonthlyPoint>,
    /// The same number of months immediately before, when requested.
    pub previous: Option<Vec<MonthlyPoint>>,
    /// Sums over `series` (and `previous`).
    pub totals: MonthlyTotals,
}

/// Revenue and bookings of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyPoint {
    /// First day of the month.
    pub month: NaiveDate,
    /// Revenue of bookings returned in the month.
    pub actual_return: f64,
    /// Bookings returned in the month.
    pub completed_bookings: i64,
}

/// Monthly sales totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTotals {
    /// Revenue over `series`.
    pub actual_return: f64,
    /// Bookings over `series`.
    pub completed_bookings: i64,
    /// Revenue over `previous`.
    pub previous_actual_return: Option<f64>,
    /// Bookings over `previous`.
    pub previous_completed_bookings: Option<i64>,
    /// Revenue percent change; `null` on a zero baseline.
    pub change_percent: Option<f64>,
}

// ── Revenue by class / top vehicles ────────────────────────────────────

/// `GET /dashboard/revenue-by-class` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RevenueByClassReport {
    /// Resolved window.
    pub range: DateRange,
    /// Reported currency.
    pub currency: String,
    /// Revenue source.
    pub revenue_source: RevenueSource,
    /// Revenue over all classes.
    pub total_revenue: f64,
    /// Highest revenue first.
    pub classes: Vec<ClassRevenue>,
}

/// Revenue of one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassRevenue {
    /// Vehicle class label.
    pub vehicle_class: String,
    /// Revenue of the class.
    pub revenue: f64,
    /// Bookings of the class.
    pub bookings: i64,
    /// Share of total revenue in percent, two decimals.
    pub share_percent: f64,
}

/// `GET /dashboard/top-vehicles` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopVehiclesReport {
    /// Resolved window.
    pub range: DateRange,
    /// Reported currency.
    pub currency: String,
    /// Revenue source.
    pub revenue_source: RevenueSource,
    /// Best earners first.
    pub vehicles: Vec<VehicleRevenue>,
}

/// Revenue of one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VehicleRevenue {
    /// Car key.
    pub car_id: CarId,
    /// Registration plate.
    pub plate_number: String,
    /// Brand and model.
    pub label: String,
    /// Vehicle class label.
    pub vehicle_class: String,
    /// Revenue of the car.
    pub revenue: f64,
    /// Bookings of the car.
    pub bookings: i64,
}

// ── Upcoming bookings / activity / snapshot ────────────────────────────

/// `GET /dashboard/upcoming-bookings` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpcomingBookingsReport {
    /// Bookings start at or after this instant.
    pub from: NaiveDateTime,
    /// Reported currency.
    pub currency: String,
    /// Soonest first.
    pub bookings: Vec<UpcomingBooking>,
}

/// A reservation that has not started yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpcomingBooking {
    /// Booking key.
    pub booking_id: BookingId,
    /// Booked car.
    pub car_id: CarId,
    /// Registration plate.
    pub plate_number: String,
    /// Brand and model.
    pub vehicle: String,
    /// Borrower display name.
    pub borrower_name: String,
    /// Destination, if given.
    pub destination: Option<String>,
    /// Pickup time.
    pub start: NaiveDateTime,
    /// Scheduled end.
    pub end: Option<NaiveDateTime>,
    /// Amount charged.
    pub total_amount: f64,
}

/// `GET /dashboard/activity-feed` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActivityFeedReport {
    /// Newest first.
    pub events: Vec<DashboardEvent>,
}

/// Where fleet snapshot figures come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Precomputed daily fleet metrics.
    DailyMetrics,
    /// Computed from cars and bookings on request.
    Live,
}

/// `GET /dashboard/fleet-snapshot` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FleetSnapshotReport {
    /// Figure provenance.
    pub source: SnapshotSource,
    /// Day the figures describe.
    pub as_of: NaiveDate,
    /// Companies aggregated.
    pub companies: usize,
    /// Headcount by state.
    pub totals: FleetCounts,
    /// Fleet-wide utilization.
    pub utilization: UtilizationRate,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_camel_case_keys() {
        let Ok(json) = serde_json::to_value(SummaryTotals {
            annual_revenue: 127_000.0,
            bookings_ytd: 2,
            average_booking_value: 63_500.0,
        }) else {
            panic!("serialization failed");
        };
        assert_eq!(json["annualRevenue"], 127_000.0);
        assert_eq!(json["bookingsYtd"], 2);
        assert_eq!(json["averageBookingValue"], 63_500.0);
    }

    #[test]
    fn monthly_point_month_is_first_of_month_text() {
        let Some(month) = NaiveDate::from_ymd_opt(2024, 3, 1) else {
            panic!("invalid fixture date");
        };
        let Ok(json) = serde_json::to_value(MonthlyPoint {
            month,
            actual_return: 0.0,
            completed_bookings: 0,
        }) else {
            panic!("serialization failed");
        };
        assert_eq!(json["month"], "2024-03-01");
    }

    #[test]
    fn revenue_source_is_snake_case() {
        let Ok(json) = serde_json::to_value(RevenueSource::from_flag(true)) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "payments");
    }
}
