//! In-process [`AnalyticsStore`] over plain record vectors.
//!
//! Evaluates the same query descriptions as [`super::PostgresStore`]
//! with the same rules (cancelled bookings excluded, only settled payments
//! counted). Used by tests and local demos.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::models::{BookingTotals, CarAmount, CarBucket, MonthAmount, MonthBucket, UpcomingBookingRow};
use super::query::{BookingQuery, OccupancyQuery, PaymentQuery};
use super::store::AnalyticsStore;
use crate::domain::filter::COMPLETION_REFERENCE;
use crate::domain::range::first_of_month;
use crate::domain::records::{Booking, Car, Company, DailyFleetMetric, DashboardEvent, Payment};
use crate::domain::utilization::Occupancy;
use crate::domain::{BookingStatus, CarId, CompanyId, PaymentStatus, Scope, TenantId};
use crate::error::AnalyticsError;

/// Record vectors queried in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    companies: Vec<Company>,
    cars: Vec<Car>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
    events: Vec<DashboardEvent>,
    metrics: Vec<DailyFleetMetric>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a company.
    #[must_use]
    pub fn with_company(mut self, company: Company) -> Self {
        self.companies.push(company);
        self
    }

    /// Adds a car.
    #[must_use]
    pub fn with_car(mut self, car: Car) -> Self {
        self.cars.push(car);
        self
    }

    /// Adds a booking.
    #[must_use]
    pub fn with_booking(mut self, booking: Booking) -> Self {
        self.bookings.push(booking);
        self
    }

    /// Adds a payment.
    #[must_use]
    pub fn with_payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    /// Adds a dashboard event.
    #[must_use]
    pub fn with_event(mut self, event: DashboardEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Adds a daily fleet metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DailyFleetMetric) -> Self {
        self.metrics.push(metric);
        self
    }

    fn in_scope(scope: &Scope, booking: &Booking) -> bool {
        scope.includes_company(booking.company_id)
            && scope.car_id.is_none_or(|car| car == booking.car_id)
    }

    fn matching_bookings<'a>(&'a self, query: &'a BookingQuery) -> impl Iterator<Item = &'a Booking> {
        self.bookings.iter().filter(move |b| {
            Self::in_scope(&query.scope, b)
                && b.status != BookingStatus::Cancelled
                && query.statuses.contains(&b.status)
                && query.window.is_none_or(|w| {
                    b.coalesce(w.columns)
                        .is_some_and(|at| w.start <= at && at <= w.end)
                })
        })
    }

    /// Settled payments matching `query`, paired with their booking.
    fn matching_payments<'a>(
        &'a self,
        query: &'a PaymentQuery,
    ) -> impl Iterator<Item = (&'a Payment, &'a Booking)> {
        let bookings: BTreeMap<_, _> = self
            .matching_bookings(&query.bookings)
            .map(|b| (b.id, b))
            .collect();
        self.payments.iter().filter_map(move |p| {
            let paid_at = p.paid_at?;
            let settled = p.status == PaymentStatus::Paid
                && query.paid_start <= paid_at
                && paid_at <= query.paid_end;
            if !settled {
                return None;
            }
            bookings.get(&p.booking_id).map(|b| (p, *b))
        })
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn owned_company_ids(&self, tenant: TenantId) -> Result<Vec<CompanyId>, AnalyticsError> {
        let mut ids: Vec<CompanyId> = self
            .companies
            .iter()
            .filter(|c| c.owner == tenant)
            .map(|c| c.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn car_company(&self, car: CarId) -> Result<Option<CompanyId>, AnalyticsError> {
        Ok(self.cars.iter().find(|c| c.id == car).map(|c| c.company_id))
    }

    async fn scope_currency(
        &self,
        companies: &[CompanyId],
    ) -> Result<Option<String>, AnalyticsError> {
        let mut owned: Vec<&Company> = self
            .companies
            .iter()
            .filter(|c| companies.contains(&c.id))
            .collect();
        owned.sort_by_key(|c| c.id);
        Ok(owned
            .into_iter()
            .filter_map(|c| c.currency.clone())
            .find(|c| !c.is_empty()))
    }

    async fn booking_totals(&self, query: &BookingQuery) -> Result<BookingTotals, AnalyticsError> {
        Ok(self
            .matching_bookings(query)
            .fold(BookingTotals::default(), |acc, b| BookingTotals {
                bookings: acc.bookings + 1,
                revenue: acc.revenue + b.total_amount,
            }))
    }

    async fn paid_total(&self, query: &PaymentQuery) -> Result<Decimal, AnalyticsError> {
        Ok(self.matching_payments(query).map(|(p, _)| p.amount).sum())
    }

    async fn monthly_bookings(
        &self,
        query: &BookingQuery,
    ) -> Result<Vec<MonthBucket>, AnalyticsError> {
        let columns = query.window.map_or(COMPLETION_REFERENCE, |w| w.columns);
        let mut months: BTreeMap<_, (i64, Decimal)> = BTreeMap::new();
        for booking in self.matching_bookings(query) {
            let Some(at) = booking.coalesce(columns) else {
                continue;
            };
            let entry = months.entry(first_of_month(at.date())).or_default();
            entry.0 += 1;
            entry.1 += booking.total_amount;
        }
        Ok(months
            .into_iter()
            .map(|(month, (bookings, revenue))| MonthBucket {
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
        let mut months: BTreeMap<_, Decimal> = BTreeMap::new();
        for (payment, _) in self.matching_payments(query) {
            let Some(paid_at) = payment.paid_at else {
                continue;
            };
            *months.entry(first_of_month(paid_at.date())).or_default() += payment.amount;
        }
        Ok(months
            .into_iter()
            .map(|(month, amount)| MonthAmount { month, amount })
            .collect())
    }

    async fn bookings_by_car(&self, query: &BookingQuery) -> Result<Vec<CarBucket>, AnalyticsError> {
        let mut cars: BTreeMap<CarId, (i64, Decimal)> = BTreeMap::new();
        for booking in self.matching_bookings(query) {
            let entry = cars.entry(booking.car_id).or_default();
            entry.0 += 1;
            entry.1 += booking.total_amount;
        }
        Ok(cars
            .into_iter()
            .map(|(car_id, (bookings, revenue))| CarBucket {
                car_id,
                bookings,
                revenue,
            })
            .collect())
    }

    async fn payments_by_car(&self, query: &PaymentQuery) -> Result<Vec<CarAmount>, AnalyticsError> {
        let mut cars: BTreeMap<CarId, Decimal> = BTreeMap::new();
        for (payment, booking) in self.matching_payments(query) {
            *cars.entry(booking.car_id).or_default() += payment.amount;
        }
        Ok(cars
            .into_iter()
            .map(|(car_id, amount)| CarAmount { car_id, amount })
            .collect())
    }

    async fn fleet(&self, scope: &Scope) -> Result<Vec<Car>, AnalyticsError> {
        let mut cars: Vec<Car> = self
            .cars
            .iter()
            .filter(|c| scope.includes_company(c.company_id))
            .filter(|c| scope.car_id.is_none_or(|car| car == c.id))
            .cloned()
            .collect();
        cars.sort_by_key(|c| c.id);
        Ok(cars)
    }

    async fn occupancies(&self, query: &OccupancyQuery) -> Result<Vec<Occupancy>, AnalyticsError> {
        let bookings = BookingQuery {
            scope: query.scope.clone(),
            statuses: query.statuses.clone(),
            window: None,
        };
        Ok(self
            .matching_bookings(&bookings)
            .map(|b| Occupancy {
                car_id: b.car_id,
                start: b.start,
                until: b.completion_reference(),
            })
            .filter(|o| o.start <= query.range.end && o.until >= query.range.start)
            .collect())
    }

    async fn upcoming_bookings(
        &self,
        scope: &Scope,
        from: NaiveDateTime,
        limit: u32,
    ) -> Result<Vec<UpcomingBookingRow>, AnalyticsError> {
        let mut rows: Vec<UpcomingBookingRow> = self
            .bookings
            .iter()
            .filter(|b| Self::in_scope(scope, b))
            .filter(|b| b.status == BookingStatus::Reserved && b.start >= from)
            .filter_map(|b| {
                let car = self.cars.iter().find(|c| c.id == b.car_id)?;
                Some(UpcomingBookingRow {
                    booking_id: b.id,
                    car_id: b.car_id,
                    plate_number: car.plate_number.clone(),
                    vehicle: car.label(),
                    borrower_name: b.borrower_name.clone(),
                    destination: b.destination.clone(),
                    start: b.start,
                    end: b.end,
                    total_amount: b.total_amount,
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.start, r.booking_id));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn recent_events(
        &self,
        scope: &Scope,
        limit: u32,
    ) -> Result<Vec<DashboardEvent>, AnalyticsError> {
        let mut events: Vec<DashboardEvent> = self
            .events
            .iter()
            .filter(|e| scope.includes_company(e.company_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        events.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(events)
    }

    async fn latest_fleet_metrics(
        &self,
        companies: &[CompanyId],
    ) -> Result<Vec<DailyFleetMetric>, AnalyticsError> {
        let mut latest: BTreeMap<CompanyId, &DailyFleetMetric> = BTreeMap::new();
        for metric in self.metrics.iter().filter(|m| companies.contains(&m.company_id)) {
            let newer = latest
                .get(&metric.company_id)
                .is_none_or(|current| metric.metric_date > current.metric_date);
            if newer {
                latest.insert(metric.company_id, metric);
            }
        }
        Ok(latest.into_values().cloned().collect())
    }
}
