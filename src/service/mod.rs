//! Service layer: report orchestration.
//!
//! [`DashboardService`] resolves the tenant scope through [`ScopeResolver`],
//! runs the aggregates against an [`crate::persistence::AnalyticsStore`]
//! and caches finished reports in an [`crate::cache::AnalyticsCache`].

pub mod dashboard_service;
pub mod fleet_reports;
pub mod scope_resolver;

pub use dashboard_service::{DashboardService, DashboardSettings};
pub use scope_resolver::ScopeResolver;
