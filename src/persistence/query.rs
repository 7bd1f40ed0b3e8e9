//! Storage-agnostic query descriptions.
//!
//! Services describe *what* to aggregate (scope, status filter, date
//! predicate) with these values; each [`super::AnalyticsStore`] adapter
//! translates them into its own query language.

use chrono::NaiveDateTime;

use crate::domain::filter::COMPLETION_REFERENCE;
use crate::domain::{BookingStatus, DateRange, Scope};

/// `COALESCE(columns...) BETWEEN start AND end` over booking date columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Booking date columns, primary first.
    pub columns: &'static [&'static str],
    /// Inclusive lower bound.
    pub start: NaiveDateTime,
    /// Inclusive upper bound.
    pub end: NaiveDateTime,
}

impl DateWindow {
    /// Window over `columns` spanning `range`.
    #[must_use]
    pub const fn new(columns: &'static [&'static str], range: DateRange) -> Self {
        Self {
            columns,
            start: range.start,
            end: range.end,
        }
    }

    /// Window over the completion reference spanning `range`.
    #[must_use]
    pub const fn completion(range: DateRange) -> Self {
        Self::new(COMPLETION_REFERENCE, range)
    }
}

/// Bookings in scope with one of `statuses`, optionally inside a window.
///
/// Cancelled bookings are excluded by every adapter regardless of
/// `statuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuery {
    /// Companies and car.
    pub scope: Scope,
    /// Counted statuses.
    pub statuses: Vec<BookingStatus>,
    /// Date predicate; `None` matches any date.
    pub window: Option<DateWindow>,
}

/// Paid payments settled inside `[paid_start, paid_end]` whose booking
/// matches `bookings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentQuery {
    /// Bookings the payments must belong to.
    pub bookings: BookingQuery,
    /// Inclusive lower bound on `paid_at`.
    pub paid_start: NaiveDateTime,
    /// Inclusive upper bound on `paid_at`.
    pub paid_end: NaiveDateTime,
}

impl PaymentQuery {
    /// Payments settled in `range` for bookings in scope with `statuses`,
    /// whatever the booking dates.
    #[must_use]
    pub fn settled_in(scope: Scope, statuses: Vec<BookingStatus>, range: DateRange) -> Self {
        Self {
            bookings: BookingQuery {
                scope,
                statuses,
                window: None,
            },
            paid_start: range.start,
            paid_end: range.end,
        }
    }
}

/// Bookings in scope whose occupancy `[start, completion]` overlaps `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyQuery {
    /// Companies and car.
    pub scope: Scope,
    /// Counted statuses.
    pub statuses: Vec<BookingStatus>,
    /// Period of interest.
    pub range: DateRange,
}
