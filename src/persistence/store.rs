//! The read interface every storage adapter implements.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::models::{BookingTotals, CarAmount, CarBucket, MonthAmount, MonthBucket, UpcomingBookingRow};
use super::query::{BookingQuery, OccupancyQuery, PaymentQuery};
use crate::domain::records::{Car, DailyFleetMetric, DashboardEvent};
use crate::domain::utilization::Occupancy;
use crate::domain::{CarId, CompanyId, Scope, TenantId};
use crate::error::AnalyticsError;

/// Read-only access to companies, cars, bookings, payments and the
/// precomputed dashboard tables.
///
/// Implementations must exclude `Cancelled` bookings from every booking
/// aggregate and only count `Paid` payments with a non-null `paid_at`.
///
/// # Errors
///
/// Every method returns [`AnalyticsError::Storage`] when the backing store
/// fails.
#[async_trait]
pub trait AnalyticsStore: Send + Sync + fmt::Debug {
    /// Companies owned by `tenant`, ascending.
    async fn owned_company_ids(&self, tenant: TenantId) -> Result<Vec<CompanyId>, AnalyticsError>;

    /// Company owning `car`, or `None` for an unknown car.
    async fn car_company(&self, car: CarId) -> Result<Option<CompanyId>, AnalyticsError>;

    /// First configured currency among `companies`, lowest id first.
    async fn scope_currency(&self, companies: &[CompanyId])
    -> Result<Option<String>, AnalyticsError>;

    /// Count and `SUM(total_amount)` of matching bookings.
    async fn booking_totals(&self, query: &BookingQuery) -> Result<BookingTotals, AnalyticsError>;

    /// Sum of matching settled payments.
    async fn paid_total(&self, query: &PaymentQuery) -> Result<Decimal, AnalyticsError>;

    /// Matching bookings grouped by month of the query's date window.
    ///
    /// Months without bookings are omitted; callers zero-fill.
    async fn monthly_bookings(&self, query: &BookingQuery)
    -> Result<Vec<MonthBucket>, AnalyticsError>;

    /// Matching settled payments grouped by month of `paid_at`.
    async fn monthly_payments(&self, query: &PaymentQuery)
    -> Result<Vec<MonthAmount>, AnalyticsError>;

    /// Matching bookings grouped by car.
    async fn bookings_by_car(&self, query: &BookingQuery) -> Result<Vec<CarBucket>, AnalyticsError>;

    /// Matching settled payments grouped by the booked car.
    async fn payments_by_car(&self, query: &PaymentQuery) -> Result<Vec<CarAmount>, AnalyticsError>;

    /// Cars in scope, ascending by id.
    async fn fleet(&self, scope: &Scope) -> Result<Vec<Car>, AnalyticsError>;

    /// Occupancy spans of bookings overlapping the query range.
    async fn occupancies(&self, query: &OccupancyQuery) -> Result<Vec<Occupancy>, AnalyticsError>;

    /// `Reserved` bookings in scope starting at or after `from`, soonest first.
    async fn upcoming_bookings(
        &self,
        scope: &Scope,
        from: NaiveDateTime,
        limit: u32,
    ) -> Result<Vec<UpcomingBookingRow>, AnalyticsError>;

    /// Latest dashboard events of the companies in scope, newest first.
    async fn recent_events(
        &self,
        scope: &Scope,
        limit: u32,
    ) -> Result<Vec<DashboardEvent>, AnalyticsError>;

    /// Most recent daily fleet metric of each company in `companies`.
    async fn latest_fleet_metrics(
        &self,
        companies: &[CompanyId],
    ) -> Result<Vec<DailyFleetMetric>, AnalyticsError>;
}
