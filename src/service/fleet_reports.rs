//! Fleet utilization and fleet snapshot reports.

use chrono::{DateTime, Days, Duration, NaiveDateTime, Utc};

use super::dashboard_service::DashboardService;
use crate::domain::range::{DateRange, end_of_day, resolve_filter_range};
use crate::domain::records::Car;
use crate::domain::report::{
    FleetSnapshotReport, FleetUtilizationReport, RefreshInfo, SnapshotSource, TimelinePoint,
    UtilizationTrend,
};
use crate::domain::trend::{UTILIZATION_PRECISION, percent_change, previous_window};
use crate::domain::utilization::{
    FleetCounts, OccupancyIndex, UtilizationRate, active_count, class_breakdown, count_fleet,
    mark_active,
};
use crate::domain::{CarId, DashboardFilter, Granularity, ReportKind, Scope, TenantId};
use crate::error::AnalyticsError;
use crate::persistence::query::OccupancyQuery;

/// Most daily samples in a utilization timeline.
pub const MAX_DAILY_SAMPLES: u64 = 30;
/// Hourly samples in a utilization timeline.
pub const HOURLY_SAMPLES: i64 = 24;

impl DashboardService {
    /// Active, available and unavailable cars at the end of the resolved
    /// range, with a per-class breakdown and a sampled timeline.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn fleet_utilization(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<FleetUtilizationReport, AnalyticsError> {
        self.cached(ReportKind::FleetUtilization, tenant, filter, || {
            self.build_fleet_utilization(tenant, filter, now)
        })
        .await
    }

    async fn build_fleet_utilization(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<FleetUtilizationReport, AnalyticsError> {
        let scope = self.resolve_scope(tenant, filter).await?;
        let range = resolve_filter_range(filter, filter.local_now(now));
        let reference = range.end;

        let samples = timeline_samples(&range, filter.granularity);
        let previous = if filter.include_trend {
            previous_window(&range)
        } else {
            None
        };

        let window_start = samples.first().copied().unwrap_or(reference);
        let (fleet, occupancies) = self
            .fleet_activity(
                &scope,
                filter,
                DateRange {
                    start: window_start,
                    end: reference,
                },
            )
            .await?;

        let snapshots = mark_active(
            fleet.iter().map(|c| {
                (
                    c.id,
                    c.vehicle_class.as_deref(),
                    c.availability_status.as_str(),
                )
            }),
            &occupancies,
            reference,
        );
        let totals = count_fleet(&snapshots);
        let utilization = UtilizationRate::of(totals.active, totals.fleet_size);
        let car_ids: Vec<CarId> = fleet.iter().map(|c| c.id).collect();

        let timeline = samples
            .into_iter()
            .map(|at| {
                let active = active_count(&car_ids, &occupancies, at);
                TimelinePoint {
                    at,
                    active,
                    fleet_size: totals.fleet_size,
                    rate: UtilizationRate::of(active, totals.fleet_size).rate,
                }
            })
            .collect();

        let previous_active = match previous {
            Some(previous_range) if !car_ids.is_empty() => {
                let at_previous_end = self
                    .occupancies_at(&scope, filter, previous_range.end)
                    .await?;
                Some(active_count(&car_ids, &at_previous_end, previous_range.end))
            }
            Some(_) => Some(0),
            None => None,
        };

        let trend = filter.include_trend.then(|| match (previous, previous_active) {
            (Some(previous_range), Some(previous_active)) => {
                let previous_rate = UtilizationRate::of(previous_active, totals.fleet_size).rate;
                UtilizationTrend {
                    previous_range: Some(previous_range),
                    previous_active: Some(previous_active),
                    previous_rate: Some(previous_rate),
                    change_percent: percent_change(
                        utilization.rate,
                        previous_rate,
                        UTILIZATION_PRECISION,
                    ),
                }
            }
            _ => UtilizationTrend {
                previous_range: None,
                previous_active: None,
                previous_rate: None,
                change_percent: None,
            },
        });

        let ttl = self.cache_ttl();
        Ok(FleetUtilizationReport {
            range,
            reference_at: reference,
            totals,
            utilization,
            breakdown: class_breakdown(&snapshots),
            refresh: RefreshInfo {
                generated_at: now,
                ttl_seconds: ttl.as_secs(),
                next_refresh_at: Duration::from_std(ttl)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(now),
                granularity: filter.granularity.as_str().to_string(),
            },
            timeline,
            trend,
        })
    }

    /// Latest fleet figures: precomputed daily metrics when every company in
    /// scope has one, otherwise computed live at the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Forbidden`] for a company or car outside
    /// the tenant's ownership, [`AnalyticsError::Storage`] on query failure.
    pub async fn fleet_snapshot(
        &self,
        tenant: TenantId,
        filter: &DashboardFilter,
        now: DateTime<Utc>,
    ) -> Result<FleetSnapshotReport, AnalyticsError> {
        self.cached(ReportKind::FleetSnapshot, tenant, filter, || async move {
            let scope = self.resolve_scope(tenant, filter).await?;
            let local = filter.local_now(now);

            if !scope.is_empty() && scope.car_id.is_none() {
                let metrics = self.store.latest_fleet_metrics(&scope.company_ids).await?;
                if metrics.len() == scope.company_ids.len() {
                    let totals = metrics.iter().fold(FleetCounts::default(), |acc, m| FleetCounts {
                        fleet_size: acc.fleet_size + m.total_cars,
                        active: acc.active + m.active_cars,
                        available: acc.available + m.available_cars,
                        unavailable: acc.unavailable + m.unavailable_cars,
                    });
                    let as_of = metrics
                        .iter()
                        .map(|m| m.metric_date)
                        .max()
                        .unwrap_or(local.date());
                    return Ok(FleetSnapshotReport {
                        source: SnapshotSource::DailyMetrics,
                        as_of,
                        companies: metrics.len(),
                        totals,
                        utilization: UtilizationRate::of(totals.active, totals.fleet_size),
                    });
                }
                tracing::debug!(%tenant, "daily fleet metrics incomplete, computing live");
            }

            let (fleet, occupancies) = self
                .fleet_activity(
                    &scope,
                    filter,
                    DateRange {
                        start: local,
                        end: local,
                    },
                )
                .await?;
            let snapshots = mark_active(
                fleet.iter().map(|c| {
                    (
                        c.id,
                        c.vehicle_class.as_deref(),
                        c.availability_status.as_str(),
                    )
                }),
                &occupancies,
                local,
            );
            let totals = count_fleet(&snapshots);
            Ok(FleetSnapshotReport {
                source: SnapshotSource::Live,
                as_of: local.date(),
                companies: scope.company_ids.len(),
                totals,
                utilization: UtilizationRate::of(totals.active, totals.fleet_size),
            })
        })
        .await
    }

    /// Cars in scope and the occupancies overlapping `window`, indexed by car.
    async fn fleet_activity(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        window: DateRange,
    ) -> Result<(Vec<Car>, OccupancyIndex), AnalyticsError> {
        if scope.is_empty() {
            return Ok((Vec::new(), OccupancyIndex::default()));
        }
        let fleet = self.store.fleet(scope).await?;
        let occupancies = self.occupancies_in(scope, filter, window).await?;
        Ok((fleet, occupancies))
    }

    /// Occupancies covering the single instant `at`.
    async fn occupancies_at(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        at: NaiveDateTime,
    ) -> Result<OccupancyIndex, AnalyticsError> {
        self.occupancies_in(scope, filter, DateRange { start: at, end: at })
            .await
    }

    async fn occupancies_in(
        &self,
        scope: &Scope,
        filter: &DashboardFilter,
        window: DateRange,
    ) -> Result<OccupancyIndex, AnalyticsError> {
        let occupancies = self
            .store
            .occupancies(&OccupancyQuery {
                scope: scope.clone(),
                statuses: filter.statuses.clone(),
                range: window,
            })
            .await?;
        tracing::debug!(
            spans = occupancies.len(),
            start = %window.start,
            end = %window.end,
            "loaded occupancies"
        );
        Ok(occupancies.into_iter().collect())
    }
}

/// Sample instants of a utilization timeline, oldest first, ending at
/// `range.end` and never before `range.start`.
///
/// Daily samples are end-of-day instants (the last one is `range.end`
/// itself); hourly samples step back 24 hours.
#[must_use]
pub fn timeline_samples(range: &DateRange, granularity: Granularity) -> Vec<NaiveDateTime> {
    let reference = range.end;
    let samples: Vec<NaiveDateTime> = match granularity {
        Granularity::Day => {
            let days = u64::try_from(range.calendar_days())
                .unwrap_or(1)
                .clamp(1, MAX_DAILY_SAMPLES);
            (0..days)
                .rev()
                .filter_map(|back| {
                    if back == 0 {
                        Some(reference)
                    } else {
                        reference
                            .date()
                            .checked_sub_days(Days::new(back))
                            .map(end_of_day)
                    }
                })
                .collect()
        }
        Granularity::Hour => (0..HOURLY_SAMPLES)
            .rev()
            .filter_map(|back| reference.checked_sub_signed(Duration::hours(back)))
            .collect(),
    };
    samples.into_iter().filter(|at| *at >= range.start).collect()
}
