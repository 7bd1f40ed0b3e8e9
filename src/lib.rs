//! # tenant-analytics
//!
//! Read-only analytics service behind the rental dashboard.
//!
//! Every report is scoped to the companies the requesting tenant owns.
//! Query parameters are normalized leniently (invalid values fall back to
//! defaults), resolved into a wall-clock date range in the tenant's zone,
//! aggregated in the database and cached by a deterministic key.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── Tenant extractor (api/tenant)
//!     │
//!     ├── DashboardService (service/)
//!     ├── ScopeResolver (service/)
//!     │
//!     ├── Filter / range / trend / utilization math (domain/)
//!     ├── Report cache (cache/)
//!     │
//!     └── AnalyticsStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
