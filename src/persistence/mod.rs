//! Persistence layer: read-only access to the back-office tables.
//!
//! Services talk to the [`AnalyticsStore`] trait using the query
//! descriptions in [`query`]. [`PostgresStore`] translates them into SQL
//! with `sqlx::QueryBuilder`; [`MemoryStore`] evaluates the same
//! descriptions over in-process records.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::AnalyticsStore;
