//! Read-only records the engine aggregates over.
//!
//! These mirror the back-office tables (companies, cars, bookings, payments)
//! plus the two precomputed read models consumed by the activity feed and
//! the fleet snapshot. The engine never writes any of them.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{BookingId, CarId, CompanyId, TenantId};

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Confirmed but not yet picked up.
    Reserved,
    /// Car is currently out with the borrower.
    Ongoing,
    /// Car returned and booking closed.
    Completed,
    /// Booking called off; never counted by any metric.
    Cancelled,
}

impl BookingStatus {
    /// Statuses counted when the caller does not ask for specific ones.
    pub const DEFAULT_SET: [Self; 3] = [Self::Reserved, Self::Ongoing, Self::Completed];

    /// Returns the value stored in the `bookings.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parses a status case-insensitively. Accepts the `canceled` spelling.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reserved" => Some(Self::Reserved),
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled; the only status that counts as revenue.
    Paid,
    /// Settlement attempt failed.
    Failed,
    /// Money returned to the borrower.
    Refunded,
    /// Payment voided.
    Cancelled,
}

impl PaymentStatus {
    /// Returns the value stored in the `payments.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// A rental company and the tenant that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// Company key.
    pub id: CompanyId,
    /// Owning tenant.
    pub owner: TenantId,
    /// Display name.
    pub name: String,
    /// ISO 4217 code reported with money values, when configured.
    pub currency: Option<String>,
}

/// A vehicle in a company's fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Car {
    /// Car key.
    pub id: CarId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Registration plate.
    pub plate_number: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Free-form availability status (`available`, `maintenance`, ...).
    pub availability_status: String,
    /// Vehicle classification label (`SUV`, `Sedan`, ...).
    pub vehicle_class: Option<String>,
}

impl Car {
    /// `"{brand} {model}"`, trimmed.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.brand, self.model).trim().to_string()
    }
}

/// A booking of one car. Timestamps are wall-clock in the company's zone.
///
/// Read projection of the `bookings` row: only the columns reports use are
/// loaded. Pricing breakdown (`rate`, `base_amount`, `extra_payment`,
/// `discount`) and the booking's own `payment_status` stay in the table;
/// revenue is `total_amount`, and settlement comes from [`Payment`] rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Booking key.
    pub id: BookingId,
    /// Booked car.
    pub car_id: CarId,
    /// Company owning the car.
    pub company_id: CompanyId,
    /// Borrower display name.
    pub borrower_name: String,
    /// Destination given at booking time.
    pub destination: Option<String>,
    /// Pickup time.
    pub start: NaiveDateTime,
    /// Scheduled end.
    pub end: Option<NaiveDateTime>,
    /// Expected return time.
    pub expected_return: Option<NaiveDateTime>,
    /// Actual return time, once returned.
    pub actual_return: Option<NaiveDateTime>,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Final amount charged.
    pub total_amount: Decimal,
}

impl Booking {
    /// When the booking finished (or is expected to):
    /// `COALESCE(actual_return, end, expected_return, start)`.
    #[must_use]
    pub fn completion_reference(&self) -> NaiveDateTime {
        self.actual_return
            .or(self.end)
            .or(self.expected_return)
            .unwrap_or(self.start)
    }

    /// Reads a date column by its database name. Unknown names yield `None`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<NaiveDateTime> {
        match name {
            "start_date" => Some(self.start),
            "end_date" => self.end,
            "expected_return_date" => self.expected_return,
            "actual_return_date" => self.actual_return,
            _ => None,
        }
    }

    /// First non-null value among `columns`, mirroring SQL `COALESCE`.
    #[must_use]
    pub fn coalesce(&self, columns: &[&str]) -> Option<NaiveDateTime> {
        columns.iter().find_map(|c| self.column(c))
    }
}

/// A payment against a booking.
///
/// Read projection of the `payments` row; the gateway `reference` and the
/// free-form `meta` column are not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    /// Payment key.
    pub id: i64,
    /// Booking being paid.
    pub booking_id: BookingId,
    /// Amount paid.
    pub amount: Decimal,
    /// Settlement status.
    pub status: PaymentStatus,
    /// Payment method (`cash`, `gcash`, ...).
    pub method: String,
    /// Settlement time; only set once paid.
    pub paid_at: Option<NaiveDateTime>,
}

/// An entry in the dashboard activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardEvent {
    /// Event key.
    pub id: i64,
    /// Company the event belongs to.
    pub company_id: CompanyId,
    /// Event discriminator (`booking_created`, `payment_received`, ...).
    pub event_type: String,
    /// Human-readable summary.
    pub message: String,
    /// When the event happened.
    pub occurred_at: NaiveDateTime,
}

/// Precomputed end-of-day fleet figures for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFleetMetric {
    /// Company the figures describe.
    pub company_id: CompanyId,
    /// Day the figures were computed for.
    pub metric_date: NaiveDate,
    /// Cars in the fleet.
    pub total_cars: i64,
    /// Cars out on a booking.
    pub active_cars: i64,
    /// Cars ready to rent.
    pub available_cars: i64,
    /// Cars in maintenance or otherwise out of service.
    pub unavailable_cars: i64,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        let Some(t) = NaiveDate::from_ymd_opt(2024, 3, day).and_then(|d| d.and_hms_opt(hour, 0, 0))
        else {
            panic!("invalid fixture date");
        };
        t
    }

    fn booking() -> Booking {
        Booking {
            id: BookingId::new(1),
            car_id: CarId::new(1),
            company_id: CompanyId::new(1),
            borrower_name: "Ana".to_string(),
            destination: None,
            start: at(1, 8),
            end: None,
            expected_return: None,
            actual_return: None,
            status: BookingStatus::Ongoing,
            total_amount: dec!(1000),
        }
    }

    #[test]
    fn completion_reference_prefers_actual_return() {
        let mut b = booking();
        b.end = Some(at(3, 8));
        b.expected_return = Some(at(4, 8));
        b.actual_return = Some(at(5, 8));
        assert_eq!(b.completion_reference(), at(5, 8));
        b.actual_return = None;
        assert_eq!(b.completion_reference(), at(3, 8));
        b.end = None;
        assert_eq!(b.completion_reference(), at(4, 8));
        b.expected_return = None;
        assert_eq!(b.completion_reference(), at(1, 8));
    }

    #[test]
    fn coalesce_skips_null_columns() {
        let mut b = booking();
        b.end = Some(at(2, 10));
        assert_eq!(
            b.coalesce(&["actual_return_date", "end_date"]),
            Some(at(2, 10))
        );
        assert_eq!(b.coalesce(&["actual_return_date"]), None);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(BookingStatus::parse("COMPLETED"), Some(BookingStatus::Completed));
        assert_eq!(BookingStatus::parse(" canceled "), Some(BookingStatus::Cancelled));
        assert_eq!(BookingStatus::parse("lost"), None);
    }
}
