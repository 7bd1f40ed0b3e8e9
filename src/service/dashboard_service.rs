//! Dashboard service: one engine behind every report endpoint.
//!
//! Each public report method follows the same pattern: look up the cache →
//! on a miss resolve the tenant scope → resolve the date range → run the
//! aggregates → assemble the report → store it. Cache failures are logged
//! and otherwise ignored.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::scope_resolver::ScopeResolver;
use crate::cache::{AnalyticsCache, cache_key};
use crate::domain::filter::{FilterDefaults, RawFilters, normalize};
use crate::domain::range::{DateRange, resolve_filter_range, years_range};
use crate::domain::report::{
    ActivityFeedReport, ClassRevenue, MonthlyPoint, MonthlySalesReport, MonthlyTotals,
    RevenueByClassReport, SummaryMeta, SummaryPeriod, SummaryReport, SummaryTotals, SummaryTrend,
    SummaryTrendMetrics, TopVehiclesReport, UpcomingBooking, UpcomingBookingsReport,
    VehicleRevenue,
};
use crate::domain::trend::{
    MONEY_PRECISION, MetricDelta, average_booking_value, kpi_delta, money, percent_change,
    previous_months, previous_window, round_f64, round_money,
};
use crate::domain::utilization::class_label;
use crate::domain::{CarId, DashboardFilter, ReportKind, RevenueSource, Scope, TenantId};
use crate::error::AnalyticsError;
use crate::persistence::AnalyticsStore;
use crate::persistence::models::BookingTotals;
use crate::persistence::query::{BookingQuery, DateWindow, PaymentQuery};

/// Default and maximum rows for `top-vehicles`.
pub const TOP_VEHICLES_LIMIT: (u32, u32) = (5, 50);
/// Default and maximum rows for `upcoming-bookings`.
pub const UPCOMING_BOOKINGS_LIMIT: (u32, u32) = (10, 50);
/// Default and maximum rows for `activity-feed`.
pub const ACTIVITY_FEED_LIMIT: (u32, u32) = (20, 100);

/// Deployment-wide report defaults.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Zone used when a request names none.
    pub default_timezone: Tz,
    /// Currency used when neither the request nor the companies name one.
    pub default_currency: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::Asia::Manila,
            default_currency: "PHP".to_string(),
        }
    }
}

/// Orchestration layer for all dashboard reports.
///
/// Stateless apart from the injected cache: owns references to the store
/// for aggregates and to the cache for finished reports.
#[derive(Debug, Clone)]
pub struct DashboardService {
    pub(super) store: Arc<dyn AnalyticsStore>,
    pub(super) cache: Arc<dyn AnalyticsCache>,
    pub(super) scopes: ScopeResolver,
    pub(super) settings: DashboardSettings,
}

impl DashboardService {
    /// Creates a new `DashboardService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn AnalyticsStore>,
        cache: Arc<dyn AnalyticsCache>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            scopes: ScopeResolver::new(Arc::clone(&store)),
            store,
            cache,
            settings,
        }
    }

    /// Lifetime of cached reports.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Normalizes a raw query string with this deployment's defaults.
    #[must_use]
    pub fn normalize(&self, query: Option<&str>, now: DateTime<Utc>) -> DashboardFilter {
        let raw = query.map(RawFilters::from_query).unwrap_or_default();
        normalize(
            &raw,
            &FilterDefaults {
                timezone: self.settings.default_timezone,
                now,
            },
        )
    }

    /// Serves `kind` from the cache, or computes and stores it.
    pub(super) async fn cached<T, F, Fut>(
        &self,
        kind: ReportKind,
        tenant: TenantId,
        filter: &DashboardFilter,
        compute: F,
    ) -> Result<T, AnalyticsError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AnalyticsError>>,
    {
        let key = cache_key(kind, tenant, filter);
        match self.cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(report) => {
                    tracing::debug!(report = kind.as_str(), %tenant, "cache hit");
                    return Ok(report);
                }
                Err(e) => {
                    tracing::warn!(report = kind.as_str(), error = %e, "discarding unreadable cache entry");
                }
            },
            Ok(None) => tracing::debug!(report = kind.as_str(), %tenant, "cache miss"),
            Err(e) => tracing::warn!(report = kind.as_str(), error = %e, "cache lookup failed"),
        }

        let report = compute().await?;

        match serde_json::to_value(&report) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, value).await {
                    tracing::warn!(report = kind.as_str(), error = %e, "cache store failed");
                }
            }
            Err(e) => tracing::warn!(report = kind.as_str(), error = %e, "report not cacheable"),
        }
        Ok(report)
    }

    pub(super) async fn resolve_scope(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
    ) -> Result<Scope, AnalyticsError> {
        self.scopes
            .resolve(tenant, filter.company_id, filter.car_id)
            .await
    }

    async fn currency(&self, scope: &Scope, filter: &DashboardFilter) -> Result<String, AnalyticsError> {
        self.scopes
            .currency(scope, filter.currency.as_deref(), &self.settings.default_currency)
            .await
    }

    // ── Summary ────────────────────────────────────────────────────────

    /// Headline revenue, booking count and average booking value.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn summary(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport, AnalyticsError> {
        self.cached(ReportKind::Summary, tenant, filter, || {
            self.build_summary(tenant, filter, now)
        })
        .await
    }

    async fn build_summary(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport, AnalyticsError> {
        let scope = self.resolve_scope(tenant, filter).await?;
        let currency = self.currency(&scope, filter).await?;
        let range = resolve_filter_range(filter, filter.local_now(now));

        let (revenue, bookings) = self.kpis(&scope, filter, range).await?;
        let totals = summary_totals(revenue, bookings);

        let trend = if filter.include_trend {
            Some(self.summary_trend(&scope, filter, range, totals).await?)
        } else {
            None
        };

        Ok(SummaryReport {
            period: SummaryPeriod {
                year: filter.year,
                preset: filter.preset.as_str().to_string(),
                timezone: filter.timezone.name().to_string(),
            },
            resolved_range: range,
            totals,
            meta: SummaryMeta {
                currency,
                date_field: filter.date_field.as_str().to_string(),
                revenue_source: RevenueSource::from_flag(filter.use_payments),
                statuses: filter.statuses.iter().map(|s| s.as_str().to_string()).collect(),
                company_ids: scope.company_ids.clone(),
                car_id: scope.car_id,
                generated_at: now,
            },
            trend,
        })
    }

    /// Revenue and booking count over `range`.
    ///
    /// The count always comes from bookings; revenue comes from settled
    /// payments when the filter asks for it.
    async fn kpis(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        range: DateRange,
    ) -> Result<(Decimal, i64), AnalyticsError> {
        if scope.is_empty() {
            return Ok((Decimal::ZERO, 0));
        }
        let BookingTotals { bookings, revenue } = self
            .store
            .booking_totals(&BookingQuery {
                scope: scope.clone(),
                statuses: filter.statuses.clone(),
                window: Some(DateWindow::new(filter.date_field.columns(), range)),
            })
            .await?;

        let revenue = if filter.use_payments {
            self.store
                .paid_total(&PaymentQuery::settled_in(
                    scope.clone(),
                    filter.statuses.clone(),
                    range,
                ))
                .await?
        } else {
            revenue
        };
        Ok((revenue, bookings))
    }

    async fn summary_trend(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        range: DateRange,
        current: SummaryTotals,
    ) -> Result<SummaryTrend, AnalyticsError> {
        let Some(previous_range) = previous_window(&range) else {
            return Ok(SummaryTrend {
                previous_range: None,
                previous_totals: None,
                revenue_change_percent: None,
                bookings_change_percent: None,
                metrics: None,
            });
        };

        let (revenue, bookings) = self.kpis(scope, filter, previous_range).await?;
        let previous = summary_totals(revenue, bookings);

        Ok(SummaryTrend {
            previous_range: Some(previous_range),
            previous_totals: Some(previous),
            revenue_change_percent: Some(kpi_delta(current.annual_revenue, previous.annual_revenue)),
            bookings_change_percent: Some(kpi_delta(
                current.bookings_ytd as f64,
                previous.bookings_ytd as f64,
            )),
            metrics: Some(SummaryTrendMetrics {
                revenue: MetricDelta::new(
                    current.annual_revenue,
                    previous.annual_revenue,
                    MONEY_PRECISION,
                ),
                bookings: MetricDelta::new(
                    current.bookings_ytd as f64,
                    previous.bookings_ytd as f64,
                    MONEY_PRECISION,
                ),
                average_booking_value: MetricDelta::new(
                    current.average_booking_value,
                    previous.average_booking_value,
                    MONEY_PRECISION,
                ),
            }),
        })
    }

    // ── Monthly sales ──────────────────────────────────────────────────

    /// Revenue and returned bookings per calendar month over whole years.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn monthly_sales(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
    ) -> Result<MonthlySalesReport, AnalyticsError> {
        self.cached(ReportKind::MonthlySales, tenant, filter, || {
            self.build_monthly_sales(tenant, filter)
        })
        .await
    }

    async fn build_monthly_sales(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
    ) -> Result<MonthlySalesReport, AnalyticsError> {
        let scope = self.resolve_scope(tenant, filter).await?;
        let currency = self.currency(&scope, filter).await?;
        let range = years_range(filter.start_year, filter.end_year);

        let series = self.monthly_series(&scope, filter, range).await?;
        let previous = match previous_months(&range) {
            Some(previous_range) if filter.include_previous => {
                Some(self.monthly_series(&scope, filter, previous_range).await?)
            }
            _ => None,
        };

        let (revenue, bookings) = sum_points(&series);
        let mut totals = MonthlyTotals {
            actual_return: revenue,
            completed_bookings: bookings,
            ..MonthlyTotals::default()
        };
        if let Some(previous) = &previous {
            let (previous_revenue, previous_bookings) = sum_points(previous);
            totals.previous_actual_return = Some(previous_revenue);
            totals.previous_completed_bookings = Some(previous_bookings);
            totals.change_percent = percent_change(revenue, previous_revenue, MONEY_PRECISION);
        }

        Ok(MonthlySalesReport {
            range,
            currency,
            revenue_source: RevenueSource::from_flag(filter.use_payments),
            series,
            previous,
            totals,
        })
    }

    /// One zero-filled point per month of `range`, bucketed by the month the
    /// booking finished (or, for payment revenue, the month it was paid).
    async fn monthly_series(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        range: DateRange,
    ) -> Result<Vec<MonthlyPoint>, AnalyticsError> {
        let months = range.months();
        if scope.is_empty() {
            return Ok(months
                .into_iter()
                .map(|month| MonthlyPoint {
                    month,
                    actual_return: 0.0,
                    completed_bookings: 0,
                })
                .collect());
        }

        let bookings: BTreeMap<_, _> = self
            .store
            .monthly_bookings(&BookingQuery {
                scope: scope.clone(),
                statuses: filter.statuses.clone(),
                window: Some(DateWindow::completion(range)),
            })
            .await?
            .into_iter()
            .map(|b| (b.month, b))
            .collect();

        let payments: Option<BTreeMap<_, _>> = if filter.use_payments {
            let rows = self
                .store
                .monthly_payments(&PaymentQuery::settled_in(
                    scope.clone(),
                    filter.statuses.clone(),
                    range,
                ))
                .await?;
            Some(rows.into_iter().map(|p| (p.month, p.amount)).collect())
        } else {
            None
        };

        Ok(months
            .into_iter()
            .map(|month| {
                let bucket = bookings.get(&month);
                let revenue = match &payments {
                    Some(paid) => paid.get(&month).copied().unwrap_or_default(),
                    None => bucket.map(|b| b.revenue).unwrap_or_default(),
                };
                MonthlyPoint {
                    month,
                    actual_return: money(revenue),
                    completed_bookings: bucket.map_or(0, |b| b.bookings),
                }
            })
            .collect())
    }

    // ── Revenue by class / top vehicles ────────────────────────────────

    /// Revenue split by vehicle class over the resolved range.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn revenue_by_class(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<RevenueByClassReport, AnalyticsError> {
        self.cached(ReportKind::RevenueByClass, tenant, filter, || {
            self.build_revenue_by_class(tenant, filter, now)
        })
        .await
    }

    async fn build_revenue_by_class(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<RevenueByClassReport, AnalyticsError> {
        let scope = self.resolve_scope(tenant, filter).await?;
        let currency = self.currency(&scope, filter).await?;
        let range = resolve_filter_range(filter, filter.local_now(now));
        let per_car = self.revenue_per_car(&scope, filter, range).await?;

        let mut classes: BTreeMap<String, (Decimal, i64)> = BTreeMap::new();
        for car in &per_car {
            let entry = classes.entry(car.vehicle_class.clone()).or_default();
            entry.0 += car.revenue;
            entry.1 += car.bookings;
        }
        let total: Decimal = classes.values().map(|(revenue, _)| *revenue).sum();

        let mut classes: Vec<ClassRevenue> = classes
            .into_iter()
            .map(|(vehicle_class, (revenue, bookings))| ClassRevenue {
                vehicle_class,
                revenue: money(revenue),
                bookings,
                share_percent: if total.is_zero() {
                    0.0
                } else {
                    money(revenue * Decimal::ONE_HUNDRED / total)
                },
            })
            .collect();
        classes.sort_by(|a, b| {
            b.revenue
                .total_cmp(&a.revenue)
                .then_with(|| a.vehicle_class.cmp(&b.vehicle_class))
        });

        Ok(RevenueByClassReport {
            range,
            currency,
            revenue_source: RevenueSource::from_flag(filter.use_payments),
            total_revenue: money(total),
            classes,
        })
    }

    /// Best-earning cars over the resolved range.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn top_vehicles(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<TopVehiclesReport, AnalyticsError> {
        self.cached(ReportKind::TopVehicles, tenant, filter, || {
            self.build_top_vehicles(tenant, filter, now)
        })
        .await
    }

    async fn build_top_vehicles(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<TopVehiclesReport, AnalyticsError> {
        let scope = self.resolve_scope(tenant, filter).await?;
        let currency = self.currency(&scope, filter).await?;
        let range = resolve_filter_range(filter, filter.local_now(now));
        let limit = clamp_limit(filter.limit, TOP_VEHICLES_LIMIT);

        let mut per_car: Vec<CarRevenue> = self
            .revenue_per_car(&scope, filter, range)
            .await?
            .into_iter()
            .filter(|c| c.bookings > 0 || !c.revenue.is_zero())
            .collect();
        per_car.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| b.bookings.cmp(&a.bookings))
                .then_with(|| a.car_id.cmp(&b.car_id))
        });
        per_car.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(TopVehiclesReport {
            range,
            currency,
            revenue_source: RevenueSource::from_flag(filter.use_payments),
            vehicles: per_car
                .into_iter()
                .map(|c| VehicleRevenue {
                    car_id: c.car_id,
                    plate_number: c.plate_number,
                    label: c.label,
                    vehicle_class: c.vehicle_class,
                    revenue: money(c.revenue),
                    bookings: c.bookings,
                })
                .collect(),
        })
    }

    /// Revenue and bookings of every car in scope, including idle ones.
    async fn revenue_per_car(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        range: DateRange,
    ) -> Result<Vec<CarRevenue>, AnalyticsError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let fleet = self.store.fleet(scope).await?;
        let bookings: BTreeMap<CarId, _> = self
            .store
            .bookings_by_car(&BookingQuery {
                scope: scope.clone(),
                statuses: filter.statuses.clone(),
                window: Some(DateWindow::new(filter.date_field.columns(), range)),
            })
            .await?
            .into_iter()
            .map(|b| (b.car_id, b))
            .collect();
        let payments: Option<BTreeMap<CarId, Decimal>> = if filter.use_payments {
            let rows = self
                .store
                .payments_by_car(&PaymentQuery::settled_in(
                    scope.clone(),
                    filter.statuses.clone(),
                    range,
                ))
                .await?;
            Some(rows.into_iter().map(|p| (p.car_id, p.amount)).collect())
        } else {
            None
        };

        Ok(fleet
            .into_iter()
            .map(|car| {
                let bucket = bookings.get(&car.id);
                let revenue = match &payments {
                    Some(paid) => paid.get(&car.id).copied().unwrap_or_default(),
                    None => bucket.map(|b| b.revenue).unwrap_or_default(),
                };
                CarRevenue {
                    car_id: car.id,
                    label: car.label(),
                    vehicle_class: class_label(car.vehicle_class.as_deref()).to_string(),
                    plate_number: car.plate_number,
                    revenue: round_money(revenue),
                    bookings: bucket.map_or(0, |b| b.bookings),
                }
            })
            .collect())
    }

    // ── Upcoming bookings / activity feed ──────────────────────────────

    /// Reservations starting from now, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn upcoming_bookings(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<UpcomingBookingsReport, AnalyticsError> {
        self.cached(ReportKind::UpcomingBookings, tenant, filter, || async move {
            let scope = self.resolve_scope(tenant, filter).await?;
            let currency = self.currency(&scope, filter).await?;
            let from = filter.local_now(now);
            let limit = clamp_limit(filter.limit, UPCOMING_BOOKINGS_LIMIT);

            let rows = if scope.is_empty() {
                Vec::new()
            } else {
                self.store.upcoming_bookings(&scope, from, limit).await?
            };

            Ok(UpcomingBookingsReport {
                from,
                currency,
                bookings: rows
                    .into_iter()
                    .map(|r| UpcomingBooking {
                        booking_id: r.booking_id,
                        car_id: r.car_id,
                        plate_number: r.plate_number,
                        vehicle: r.vehicle,
                        borrower_name: r.borrower_name,
                        destination: r.destination,
                        start: r.start,
                        end: r.end,
                        total_amount: money(r.total_amount),
                    })
                    .collect(),
            })
        })
        .await
    }

    /// Latest dashboard events of the companies in scope.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn activity_feed(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
    ) -> Result<ActivityFeedReport, AnalyticsError> {
        self.cached(ReportKind::ActivityFeed, tenant, filter, || async move {
            let scope = self.resolve_scope(tenant, filter).await?;
            let limit = clamp_limit(filter.limit, ACTIVITY_FEED_LIMIT);
            let events = if scope.is_empty() {
                Vec::new()
            } else {
                self.store.recent_events(&scope, limit).await?
            };
            Ok(ActivityFeedReport { events })
        })
        .await
    }
}

/// Per-car revenue before conversion to display money.
#[derive(Debug)]
struct CarRevenue {
    car_id: CarId,
    plate_number: String,
    label: String,
    vehicle_class: String,
    revenue: Decimal,
    bookings: i64,
}

fn summary_totals(revenue: Decimal, bookings: i64) -> SummaryTotals {
    SummaryTotals {
        annual_revenue: money(revenue),
        bookings_ytd: bookings,
        average_booking_value: money(average_booking_value(revenue, bookings)),
    }
}

fn sum_points(points: &[MonthlyPoint]) -> (f64, i64) {
    let revenue: f64 = points.iter().map(|p| p.actual_return).sum();
    let bookings = points.iter().map(|p| p.completed_bookings).sum();
    (round_f64(revenue, MONEY_PRECISION), bookings)
}

/// `requested` bounded to `1..=max`, or the default.
pub(super) fn clamp_limit(requested: Option<u32>, (default, max): (u32, u32)) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}
