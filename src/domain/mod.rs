//! Domain layer: identifiers, records, filters and the pure analytics math.
//!
//! Nothing in this module performs I/O. Filter normalization, range
//! resolution, trend and utilization calculations are plain functions over
//! plain data so that every rounding and zero-division rule lives in one
//! place and is unit tested directly.

pub mod filter;
pub mod ids;
pub mod range;
pub mod records;
pub mod report;
pub mod scope;
pub mod trend;
pub mod utilization;

pub use filter::{DashboardFilter, DateField, FilterDefaults, Granularity, Preset, RawFilters};
pub use ids::{BookingId, CarId, CompanyId, TenantId};
pub use range::DateRange;
pub use records::{BookingStatus, PaymentStatus};
pub use report::{ReportKind, RevenueSource};
pub use scope::Scope;
