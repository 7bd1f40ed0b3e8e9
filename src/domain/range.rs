//! Date range resolution.
//!
//! Resolves a (year, preset, custom bounds, now) tuple into an inclusive
//! wall-clock window with second precision. The result always lies inside
//! the requested calendar year and never has `start > end`.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::filter::{DashboardFilter, MAX_YEAR, MIN_YEAR, Preset};

/// Inclusive wall-clock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    /// First instant in the window.
    pub start: NaiveDateTime,
    /// Last instant in the window.
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }

    /// Number of calendar days the window touches, counting both ends.
    #[must_use]
    pub fn calendar_days(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }

    /// First day of every calendar month the window touches, in order.
    #[must_use]
    pub fn months(&self) -> Vec<NaiveDate> {
        let mut months = Vec::new();
        let mut cursor = first_of_month(self.start.date());
        let last = first_of_month(self.end.date());
        while cursor <= last {
            months.push(cursor);
            match cursor.checked_add_months(Months::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        months
    }
}

/// Midnight at the start of `date`.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// 23:59:59 on `date`.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}

/// First day of the month containing `date`.
#[must_use]
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `[Jan 1 00:00:00, Dec 31 23:59:59]` of `year`, clamped to the supported years.
#[must_use]
pub fn year_bounds(year: i32) -> DateRange {
    let year = year.clamp(MIN_YEAR, MAX_YEAR);
    let first = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default();
    let last = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(first);
    DateRange {
        start: start_of_day(first),
        end: end_of_day(last),
    }
}

/// Latest instant a window in `year` may reach: now for the current year,
/// year end otherwise.
#[must_use]
pub fn now_ceiling(year: i32, now: NaiveDateTime) -> NaiveDateTime {
    let bounds = year_bounds(year);
    if now.year() == year {
        now.min(bounds.end)
    } else {
        bounds.end
    }
}

/// Resolves the reporting window for the given preset.
///
/// `now` is the request time as wall-clock in the tenant's zone.
#[must_use]
pub fn resolve_range(
    year: i32,
    preset: Preset,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    now: NaiveDateTime,
) -> DateRange {
    let bounds = year_bounds(year);
    let ceiling = now_ceiling(year, now);

    let (start, end) = match preset {
        Preset::YearToDate => (bounds.start, ceiling),
        Preset::Last30Days => {
            let first = ceiling
                .date()
                .checked_sub_days(Days::new(29))
                .unwrap_or(bounds.start.date());
            (start_of_day(first), ceiling)
        }
        Preset::QuarterToDate => {
            let day = ceiling.date();
            let quarter_month = (day.month0() / 3) * 3 + 1;
            let first = NaiveDate::from_ymd_opt(day.year(), quarter_month, 1)
                .unwrap_or(bounds.start.date());
            (start_of_day(first), ceiling)
        }
        Preset::Custom => (
            custom_start.map_or(bounds.start, start_of_day),
            custom_end.map_or(bounds.end, end_of_day),
        ),
    };

    let start = start.clamp(bounds.start, bounds.end);
    let end = end.clamp(bounds.start, bounds.end);
    if start > end {
        DateRange {
            start: bounds.start,
            end,
        }
    } else {
        DateRange { start, end }
    }
}

/// Resolves the reporting window described by a normalized filter.
#[must_use]
pub fn resolve_filter_range(filter: &DashboardFilter, now: NaiveDateTime) -> DateRange {
    resolve_range(
        filter.year,
        filter.preset,
        filter.custom_start,
        filter.custom_end,
        now,
    )
}

/// Whole-year window spanning `start_year..=end_year`.
#[must_use]
pub fn years_range(start_year: i32, end_year: i32) -> DateRange {
    DateRange {
        start: year_bounds(start_year).start,
        end: year_bounds(end_year).end,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(y, m, d) else {
            panic!("invalid fixture date");
        };
        date
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        let Some(t) = day(y, m, d).and_hms_opt(h, min, s) else {
            panic!("invalid fixture time");
        };
        t
    }

    fn now() -> NaiveDateTime {
        at(2026, 10, 17, 12, 0, 0)
    }

    #[test]
    fn ytd_current_year_ends_now() {
        let r = resolve_range(2026, Preset::YearToDate, None, None, now());
        assert_eq!(r.start, at(2026, 1, 1, 0, 0, 0));
        assert_eq!(r.end, now());
    }

    #[test]
    fn ytd_past_year_ends_at_year_end() {
        let r = resolve_range(2024, Preset::YearToDate, None, None, now());
        assert_eq!(r.start, at(2024, 1, 1, 0, 0, 0));
        assert_eq!(r.end, at(2024, 12, 31, 23, 59, 59));
    }

    #[test]
    fn last_30_days_starts_at_midnight() {
        let r = resolve_range(2026, Preset::Last30Days, None, None, now());
        assert_eq!(r.start, at(2026, 9, 18, 0, 0, 0));
        assert_eq!(r.end, now());
        assert_eq!(r.calendar_days(), 30);
    }

    #[test]
    fn last_30_days_early_january_is_clamped_to_year() {
        let r = resolve_range(2026, Preset::Last30Days, None, None, at(2026, 1, 10, 9, 0, 0));
        assert_eq!(r.start, at(2026, 1, 1, 0, 0, 0));
    }

    #[test]
    fn quarter_to_date_starts_on_quarter_boundary() {
        let r = resolve_range(2026, Preset::QuarterToDate, None, None, now());
        assert_eq!(r.start, at(2026, 10, 1, 0, 0, 0));
        let r = resolve_range(2025, Preset::QuarterToDate, None, None, now());
        assert_eq!(r.start, at(2025, 10, 1, 0, 0, 0));
        assert_eq!(r.end, at(2025, 12, 31, 23, 59, 59));
    }

    #[test]
    fn custom_uses_whole_days() {
        let r = resolve_range(
            2024,
            Preset::Custom,
            Some(day(2024, 1, 1)),
            Some(day(2024, 12, 31)),
            now(),
        );
        assert_eq!(r.start, at(2024, 1, 1, 0, 0, 0));
        assert_eq!(r.end, at(2024, 12, 31, 23, 59, 59));
    }

    #[test]
    fn custom_outside_year_is_clamped() {
        let r = resolve_range(
            2024,
            Preset::Custom,
            Some(day(2023, 6, 1)),
            Some(day(2025, 2, 1)),
            now(),
        );
        assert_eq!(r, year_bounds(2024));
    }

    #[test]
    fn inverted_custom_resets_start() {
        let r = resolve_range(
            2024,
            Preset::Custom,
            Some(day(2024, 8, 1)),
            Some(day(2024, 3, 1)),
            now(),
        );
        assert_eq!(r.start, at(2024, 1, 1, 0, 0, 0));
        assert_eq!(r.end, at(2024, 3, 1, 23, 59, 59));
    }

    #[test]
    fn custom_missing_bounds_default_to_year() {
        let r = resolve_range(2024, Preset::Custom, None, Some(day(2024, 2, 10)), now());
        assert_eq!(r.start, at(2024, 1, 1, 0, 0, 0));
        let r = resolve_range(2024, Preset::Custom, Some(day(2024, 2, 10)), None, now());
        assert_eq!(r.end, at(2024, 12, 31, 23, 59, 59));
    }

    #[test]
    fn months_cover_partial_edges() {
        let r = DateRange {
            start: at(2024, 11, 15, 0, 0, 0),
            end: at(2025, 2, 3, 0, 0, 0),
        };
        assert_eq!(
            r.months(),
            vec![day(2024, 11, 1), day(2024, 12, 1), day(2025, 1, 1), day(2025, 2, 1)]
        );
    }

    #[test]
    fn years_range_spans_whole_years() {
        let r = years_range(2023, 2024);
        assert_eq!(r.months().len(), 24);
        assert!(r.contains(at(2023, 7, 1, 0, 0, 0)));
    }
}
