//! PostgreSQL implementation of [`AnalyticsStore`].
//!
//! Query descriptions are rendered with `sqlx::QueryBuilder`. Column
//! names only ever come from the static lists in
//! [`crate::domain::filter`]; every value is bound.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::models::{BookingTotals, CarAmount, CarBucket, MonthAmount, MonthBucket, UpcomingBookingRow};
use super::query::{BookingQuery, DateWindow, OccupancyQuery, PaymentQuery};
use super::store::AnalyticsStore;
use crate::domain::filter::COMPLETION_REFERENCE;
use crate::domain::records::{Car, DailyFleetMetric, DashboardEvent};
use crate::domain::utilization::Occupancy;
use crate::domain::{BookingId, BookingStatus, CarId, CompanyId, PaymentStatus, Scope, TenantId};
use crate::error::AnalyticsError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `alias.col` or `COALESCE(alias.a, alias.b, ...)`.
fn date_expr(alias: &str, columns: &[&str]) -> String {
    match columns {
        [single] => format!("{alias}.{single}"),
        _ => {
            let parts: Vec<String> = columns.iter().map(|c| format!("{alias}.{c}")).collect();
            format!("COALESCE({})", parts.join(", "))
        }
    }
}

fn status_names(statuses: &[BookingStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// Company (and car) restriction on booking alias `b`.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, b: &str, scope: &Scope) {
    qb.push(format!("{b}.company_id = ANY("));
    qb.push_bind(scope.company_keys());
    qb.push(")");
    if let Some(car) = scope.car_id {
        qb.push(format!(" AND {b}.car_id = "));
        qb.push_bind(car.get());
    }
}

/// Full booking predicate on alias `b`, without a leading `WHERE`.
fn push_booking_predicate(qb: &mut QueryBuilder<'_, Postgres>, b: &str, query: &BookingQuery) {
    push_scope(qb, b, &query.scope);
    qb.push(format!(" AND {b}.status::text = ANY("));
    qb.push_bind(status_names(&query.statuses));
    qb.push(format!(") AND {b}.status::text <> "));
    qb.push_bind(BookingStatus::Cancelled.as_str());
    if let Some(window) = query.window {
        push_window(qb, b, &window);
    }
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, b: &str, window: &DateWindow) {
    qb.push(" AND ");
    qb.push(date_expr(b, window.columns));
    qb.push(" BETWEEN ");
    qb.push_bind(window.start);
    qb.push(" AND ");
    qb.push_bind(window.end);
}

/// Settled-payment predicate on payment alias `p`; the booking side is a
/// subquery over alias `b`.
fn push_paid_predicate(qb: &mut QueryBuilder<'_, Postgres>, query: &PaymentQuery) {
    qb.push("p.status::text = ");
    qb.push_bind(PaymentStatus::Paid.as_str());
    qb.push(" AND p.paid_at IS NOT NULL AND p.paid_at BETWEEN ");
    qb.push_bind(query.paid_start);
    qb.push(" AND ");
    qb.push_bind(query.paid_end);
    qb.push(" AND p.booking_id IN (SELECT b.id FROM bookings b WHERE ");
    push_booking_predicate(qb, "b", &query.bookings);
    qb.push(")");
}

fn limit(value: u32) -> i64 {
    i64::from(value)
}

#[async_trait]
impl AnalyticsStore for PostgresStore {
    async fn owned_company_ids(&self, tenant: TenantId) -> Result<Vec<CompanyId>, AnalyticsError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM companies WHERE owner_id = $1 ORDER BY id")
            .bind(tenant.get())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(CompanyId::new).collect())
    }

    async fn car_company(&self, car: CarId) -> Result<Option<CompanyId>, AnalyticsError> {
        let company = sqlx::query_scalar::<_, i64>("SELECT company_id FROM cars WHERE id = $1")
            .bind(car.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(company.map(CompanyId::new))
    }

    async fn scope_currency(
        &self,
        companies: &[CompanyId],
    ) -> Result<Option<String>, AnalyticsError> {
        let keys: Vec<i64> = companies.iter().map(|c| c.get()).collect();
        let currency = sqlx::query_scalar::<_, String>(
            "SELECT currency FROM companies \
             WHERE id = ANY($1) AND currency IS NOT NULL AND currency <> '' \
             ORDER BY id LIMIT 1",
        )
        .bind(keys)
        .fetch_optional(&self.pool)
        .await?;
        Ok(currency)
    }

    async fn booking_totals(&self, query: &BookingQuery) -> Result<BookingTotals, AnalyticsError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*)::BIGINT, COALESCE(SUM(b.total_amount), 0)::NUMERIC \
             FROM bookings b WHERE ",
        );
        push_booking_predicate(&mut qb, "b", query);

        let (bookings, revenue) = qb
            .build_query_as::<(i64, Decimal)>()
            .fetch_one(&self.pool)
            .await?;
        Ok(BookingTotals { bookings, revenue })
    }

    async fn paid_total(&self, query: &PaymentQuery) -> Result<Decimal, AnalyticsError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COALESCE(SUM(p.amount), 0)::NUMERIC FROM payments p WHERE ");
        push_paid_predicate(&mut qb, query);

        let total = qb
            .build_query_scalar::<Decimal>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn monthly_bookings(
        &self,
        query: &BookingQuery,
    ) -> Result<Vec<MonthBucket>, AnalyticsError> {
        let columns = query.window.map_or(COMPLETION_REFERENCE, |w| w.columns);
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT date_trunc('month', {})::date AS month, COUNT(*)::BIGINT, \
             COALESCE(SUM(b.total_amount), 0)::NUMERIC FROM bookings b WHERE ",
            date_expr("b", columns)
        ));
        push_booking_predicate(&mut qb, "b", query);
        qb.push(" GROUP BY 1 ORDER BY 1");

        let rows = qb
            .build_query_as::<(NaiveDate, i64, Decimal)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(month, bookings, revenue)| MonthBucket {
                month,
                bookings,
                revenue,
            })
            .collect())
    }

    async fn monthly_payments(
        &self,
        query: &PaymentQuery,
    ) -> Result<Vec<MonthAmount>, AnalyticsError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT date_trunc('month', p.paid_at)::date AS month, \
             COALESCE(SUM(p.amount), 0)::NUMERIC FROM payments p WHERE ",
        );
        push_paid_predicate(&mut qb, query);
        qb.push(" GROUP BY 1 ORDER BY 1");

        let rows = qb
            .build_query_as::<(NaiveDate, Decimal)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(month, amount)| MonthAmount { month, amount })
            .collect())
    }

    async fn bookings_by_car(&self, query: &BookingQuery) -> Result<Vec<CarBucket>, AnalyticsError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT b.car_id, COUNT(*)::BIGINT, COALESCE(SUM(b.total_amount), 0)::NUMERIC \
             FROM bookings b WHERE ",
        );
        push_booking_predicate(&mut qb, "b", query);
        qb.push(" GROUP BY b.car_id");

        let rows = qb
            .build_query_as::<(i64, i64, Decimal)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(car_id, bookings, revenue)| CarBucket {
                car_id: CarId::new(car_id),
                bookings,
                revenue,
            })
            .collect())
    }

    async fn payments_by_car(&self, query: &PaymentQuery) -> Result<Vec<CarAmount>, AnalyticsError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT bk.car_id, COALESCE(SUM(p.amount), 0)::NUMERIC \
             FROM payments p JOIN bookings bk ON bk.id = p.booking_id WHERE ",
        );
        push_paid_predicate(&mut qb, query);
        qb.push(" GROUP BY bk.car_id");

        let rows = qb
            .build_query_as::<(i64, Decimal)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(car_id, amount)| CarAmount {
                car_id: CarId::new(car_id),
                amount,
            })
            .collect())
    }

    async fn fleet(&self, scope: &Scope) -> Result<Vec<Car>, AnalyticsError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.company_id, COALESCE(c.plate_number, ''), COALESCE(c.brand, ''), \
             COALESCE(c.model, ''), COALESCE(c.availability_status, ''), c.vehicle_class \
             FROM cars c WHERE c.company_id = ANY(",
        );
        qb.push_bind(scope.company_keys());
        qb.push(")");
        if let Some(car) = scope.car_id {
            qb.push(" AND c.id = ");
            qb.push_bind(car.get());
        }
        qb.push(" ORDER BY c.id");

        let rows = qb
            .build_query_as::<(i64, i64, String, String, String, String, Option<String>)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, company_id, plate_number, brand, model, availability_status, vehicle_class)| {
                    Car {
                        id: CarId::new(id),
                        company_id: CompanyId::new(company_id),
                        plate_number,
                        brand,
                        model,
                        availability_status,
                        vehicle_class,
                    }
                },
            )
            .collect())
    }

    async fn occupancies(&self, query: &OccupancyQuery) -> Result<Vec<Occupancy>, AnalyticsError> {
        let until = date_expr("b", COMPLETION_REFERENCE);
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT b.car_id, b.start_date, {until} FROM bookings b WHERE "
        ));
        push_booking_predicate(
            &mut qb,
            "b",
            &BookingQuery {
                scope: query.scope.clone(),
                statuses: query.statuses.clone(),
                window: None,
            },
        );
        qb.push(" AND b.start_date <= ");
        qb.push_bind(query.range.end);
        qb.push(format!(" AND {until} >= "));
        qb.push_bind(query.range.start);

        let rows = qb
            .build_query_as::<(i64, NaiveDateTime, NaiveDateTime)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(car_id, start, until)| Occupancy {
                car_id: CarId::new(car_id),
                start,
                until,
            })
            .collect())
    }

    async fn upcoming_bookings(
        &self,
        scope: &Scope,
        from: NaiveDateTime,
        limit_rows: u32,
    ) -> Result<Vec<UpcomingBookingRow>, AnalyticsError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT b.id, b.car_id, COALESCE(c.plate_number, ''), \
             TRIM(CONCAT(c.brand, ' ', c.model)), COALESCE(b.borrower_name, ''), \
             b.destination, b.start_date, b.end_date, b.total_amount \
             FROM bookings b JOIN cars c ON c.id = b.car_id WHERE ",
        );
        push_scope(&mut qb, "b", scope);
        qb.push(" AND b.status::text = ");
        qb.push_bind(BookingStatus::Reserved.as_str());
        qb.push(" AND b.start_date >= ");
        qb.push_bind(from);
        qb.push(" ORDER BY b.start_date ASC, b.id ASC LIMIT ");
        qb.push_bind(limit(limit_rows));

        #[allow(clippy::type_complexity)]
        let rows = qb
            .build_query_as::<(
                i64,
                i64,
                String,
                String,
                String,
                Option<String>,
                NaiveDateTime,
                Option<NaiveDateTime>,
                Decimal,
            )>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, car_id, plate_number, vehicle, borrower_name, destination, start, end, total)| {
                    UpcomingBookingRow {
                        booking_id: BookingId::new(id),
                        car_id: CarId::new(car_id),
                        plate_number,
                        vehicle,
                        borrower_name,
                        destination,
                        start,
                        end,
                        total_amount: total,
                    }
                },
            )
            .collect())
    }

    async fn recent_events(
        &self,
        scope: &Scope,
        limit_rows: u32,
    ) -> Result<Vec<DashboardEvent>, AnalyticsError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, NaiveDateTime)>(
            "SELECT id, company_id, event_type, message, occurred_at FROM dashboard_events \
             WHERE company_id = ANY($1) ORDER BY occurred_at DESC, id DESC LIMIT $2",
        )
        .bind(scope.company_keys())
        .bind(limit(limit_rows))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, company_id, event_type, message, occurred_at)| DashboardEvent {
                    id,
                    company_id: CompanyId::new(company_id),
                    event_type,
                    message,
                    occurred_at,
                },
            )
            .collect())
    }

    async fn latest_fleet_metrics(
        &self,
        companies: &[CompanyId],
    ) -> Result<Vec<DailyFleetMetric>, AnalyticsError> {
        let keys: Vec<i64> = companies.iter().map(|c| c.get()).collect();
        let rows = sqlx::query_as::<_, (i64, NaiveDate, i64, i64, i64, i64)>(
            "SELECT DISTINCT ON (company_id) company_id, metric_date, total_cars::BIGINT, \
             active_cars::BIGINT, available_cars::BIGINT, unavailable_cars::BIGINT \
             FROM daily_fleet_metrics WHERE company_id = ANY($1) \
             ORDER BY company_id, metric_date DESC",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(company_id, metric_date, total_cars, active_cars, available_cars, unavailable_cars)| {
                    DailyFleetMetric {
                        company_id: CompanyId::new(company_id),
                        metric_date,
                        total_cars,
                        active_cars,
                        available_cars,
                        unavailable_cars,
                    }
                },
            )
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn date_expr_single_column_is_bare() {
        assert_eq!(date_expr("b", &["start_date"]), "b.start_date");
    }

    #[test]
    fn date_expr_falls_back_with_coalesce() {
        assert_eq!(
            date_expr("b", &["actual_return_date", "end_date"]),
            "COALESCE(b.actual_return_date, b.end_date)"
        );
    }

    #[test]
    fn booking_predicate_binds_every_value() {
        let query = BookingQuery {
            scope: Scope {
                company_ids: vec![CompanyId::new(1)],
                car_id: Some(CarId::new(9)),
            },
            statuses: vec![BookingStatus::Completed],
            window: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM bookings b WHERE ");
        push_booking_predicate(&mut qb, "b", &query);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM bookings b WHERE b.company_id = ANY($1) AND b.car_id = $2 \
             AND b.status::text = ANY($3) AND b.status::text <> $4"
        );
    }

    #[test]
    fn paid_predicate_binds_the_status() {
        let Some(start) = NaiveDate::from_ymd_opt(2026, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        else {
            panic!("invalid fixture date");
        };
        let query = PaymentQuery {
            bookings: BookingQuery {
                scope: Scope {
                    company_ids: vec![CompanyId::new(1)],
                    car_id: None,
                },
                statuses: vec![BookingStatus::Completed],
                window: None,
            },
            paid_start: start,
            paid_end: start,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM payments p WHERE ");
        push_paid_predicate(&mut qb, &query);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM payments p WHERE p.status::text = $1 \
             AND p.paid_at IS NOT NULL AND p.paid_at BETWEEN $2 AND $3 \
             AND p.booking_id IN (SELECT b.id FROM bookings b WHERE b.company_id = ANY($4) \
             AND b.status::text = ANY($5) AND b.status::text <> $6)"
        );
    }
}
