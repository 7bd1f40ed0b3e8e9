//! Period-over-period comparison and the rounding rules shared by every report.
//!
//! Two zero-division policies coexist:
//!
//! - [`percent_change`] is used inside trend blocks and yields `None` when the
//!   previous value is zero.
//! - [`kpi_delta`] is used for headline KPI deltas and yields `+100` when
//!   the metric appeared from nothing, `0` when both values are zero.
//!
//! Likewise there are two previous-period shapes: [`previous_window`]
//! (equal number of days, for ranged KPIs) and [`previous_months`] (whole
//! calendar months, for the monthly series).

use chrono::{Days, Duration, Months};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::range::{DateRange, first_of_month, start_of_day};

/// Precision for money and count percent changes.
pub const MONEY_PRECISION: u32 = 2;
/// Precision for utilization percent changes.
pub const UTILIZATION_PRECISION: u32 = 1;

/// Current versus previous value of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricDelta {
    /// Value in the current window.
    pub current: f64,
    /// Value in the previous window.
    pub previous: f64,
    /// `current - previous`.
    pub difference: f64,
    /// Percent change; `null` when the previous value is zero.
    pub percent: Option<f64>,
}

impl MetricDelta {
    /// Builds a delta, rounding the difference to money precision.
    #[must_use]
    pub fn new(current: f64, previous: f64, precision: u32) -> Self {
        Self {
            current,
            previous,
            difference: round_f64(current - previous, MONEY_PRECISION),
            percent: percent_change(current, previous, precision),
        }
    }
}

/// The equal-length window immediately before `current`.
///
/// Ends one second before `current.start` and starts at midnight, spanning
/// the same number of calendar days. `None` when the window cannot be
/// represented.
#[must_use]
pub fn previous_window(current: &DateRange) -> Option<DateRange> {
    let days = u64::try_from(current.calendar_days().max(1)).ok()?;
    let end = current.start.checked_sub_signed(Duration::seconds(1))?;
    let first = end.date().checked_sub_days(Days::new(days - 1))?;
    let start = start_of_day(first);
    (start <= end).then_some(DateRange { start, end })
}

/// The same number of whole calendar months immediately before `current`.
///
/// Used by the monthly sales series, which compares month against month
/// rather than an equal number of days.
#[must_use]
pub fn previous_months(current: &DateRange) -> Option<DateRange> {
    let count = u32::try_from(current.months().len()).ok()?;
    let first = first_of_month(current.start.date());
    let start = first.checked_sub_months(Months::new(count))?;
    let end = start_of_day(first).checked_sub_signed(Duration::seconds(1))?;
    Some(DateRange {
        start: start_of_day(start),
        end,
    })
}

/// `round((current - previous) / previous * 100, precision)`, or `None`
/// when `previous` is zero.
#[must_use]
pub fn percent_change(current: f64, previous: f64, precision: u32) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some(round_f64((current - previous) / previous * 100.0, precision))
}

/// Headline KPI delta in percent with two decimals.
#[must_use]
pub fn kpi_delta(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    round_f64((current - previous) / previous * 100.0, MONEY_PRECISION)
}

/// Revenue per booking, 0 when there are no bookings.
#[must_use]
pub fn average_booking_value(revenue: Decimal, bookings: i64) -> Decimal {
    if bookings <= 0 {
        return Decimal::ZERO;
    }
    round_money(revenue / Decimal::from(bookings))
}

/// Rounds to two decimals, halves away from zero.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// Display form of a money amount.
#[must_use]
pub fn money(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or(0.0)
}

/// Rounds to `precision` decimals, halves away from zero.
#[must_use]
pub fn round_f64(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(precision).unwrap_or(0));
    (value * factor).round() / factor
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        let Some(t) = NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(h, min, s))
        else {
            panic!("invalid fixture time");
        };
        t
    }

    #[test]
    fn previous_window_mirrors_length() {
        let current = DateRange {
            start: at(2026, 9, 18, 0, 0, 0),
            end: at(2026, 10, 17, 12, 0, 0),
        };
        let Some(prev) = previous_window(&current) else {
            panic!("expected a previous window");
        };
        assert_eq!(prev.end, at(2026, 9, 17, 23, 59, 59));
        assert_eq!(prev.start, at(2026, 8, 19, 0, 0, 0));
        assert_eq!(prev.calendar_days(), current.calendar_days());
    }

    #[test]
    fn previous_window_of_full_year_is_prior_year_sized() {
        let current = DateRange {
            start: at(2024, 1, 1, 0, 0, 0),
            end: at(2024, 12, 31, 23, 59, 59),
        };
        let Some(prev) = previous_window(&current) else {
            panic!("expected a previous window");
        };
        assert_eq!(prev.end, at(2023, 12, 31, 23, 59, 59));
        // 2024 has 366 days, so the mirror reaches back into 2022.
        assert_eq!(prev.start, at(2022, 12, 31, 0, 0, 0));
    }

    #[test]
    fn previous_months_is_calendar_aligned() {
        let current = DateRange {
            start: at(2023, 1, 1, 0, 0, 0),
            end: at(2024, 12, 31, 23, 59, 59),
        };
        let Some(prev) = previous_months(&current) else {
            panic!("expected previous months");
        };
        assert_eq!(prev.start, at(2021, 1, 1, 0, 0, 0));
        assert_eq!(prev.end, at(2022, 12, 31, 23, 59, 59));
        assert_eq!(prev.months().len(), 24);
    }

    #[test]
    fn percent_change_is_null_on_zero_previous() {
        assert_eq!(percent_change(10.0, 0.0, 2), None);
        assert_eq!(percent_change(0.0, 0.0, 2), None);
        assert_eq!(percent_change(150.0, 100.0, 2), Some(50.0));
        assert_eq!(percent_change(1.0, 3.0, 2), Some(-66.67));
        assert_eq!(percent_change(0.625, 0.5, 1), Some(25.0));
    }

    #[test]
    fn kpi_delta_policy() {
        assert_eq!(kpi_delta(5.0, 0.0), 100.0);
        assert_eq!(kpi_delta(0.0, 0.0), 0.0);
        assert_eq!(kpi_delta(50.0, 200.0), -75.0);
    }

    #[test]
    fn average_booking_value_rounds_and_guards_zero() {
        assert_eq!(average_booking_value(dec!(127000), 2), dec!(63500));
        assert_eq!(average_booking_value(dec!(100), 3), dec!(33.33));
        assert_eq!(average_booking_value(dec!(100), 0), Decimal::ZERO);
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(money(dec!(10.005)), 10.01);
        assert_eq!(money(dec!(55000)), 55000.0);
    }

    #[test]
    fn metric_delta_combines_rules() {
        let d = MetricDelta::new(120.0, 0.0, MONEY_PRECISION);
        assert_eq!(d.difference, 120.0);
        assert_eq!(d.percent, None);
    }
}
