//! Aggregate rows returned by the storage adapters.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BookingId, CarId};

/// Count and revenue of matching bookings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingTotals {
    /// Matching bookings.
    pub bookings: i64,
    /// `SUM(total_amount)`.
    pub revenue: Decimal,
}

/// Bookings grouped by calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthBucket {
    /// First day of the month.
    pub month: NaiveDate,
    /// Bookings in the month.
    pub bookings: i64,
    /// `SUM(total_amount)` in the month.
    pub revenue: Decimal,
}

/// Settled payments grouped by calendar month of `paid_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthAmount {
    /// First day of the month.
    pub month: NaiveDate,
    /// Amount settled in the month.
    pub amount: Decimal,
}

/// Bookings grouped by car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarBucket {
    /// Booked car.
    pub car_id: CarId,
    /// Bookings of the car.
    pub bookings: i64,
    /// `SUM(total_amount)` of the car.
    pub revenue: Decimal,
}

/// Settled payments grouped by the booked car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarAmount {
    /// Booked car.
    pub car_id: CarId,
    /// Amount settled for the car.
    pub amount: Decimal,
}

/// Reservation joined with its car for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingBookingRow {
    /// Booking key.
    pub booking_id: BookingId,
    /// Booked car.
    pub car_id: CarId,
    /// Registration plate.
    pub plate_number: String,
    /// Brand and model.
    pub vehicle: String,
    /// Borrower display name.
    pub borrower_name: String,
    /// Destination, if given.
    pub destination: Option<String>,
    /// Pickup time.
    pub start: NaiveDateTime,
    /// Scheduled end.
    pub end: Option<NaiveDateTime>,
    /// Amount charged.
    pub total_amount: Decimal,
}
