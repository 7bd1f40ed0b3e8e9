//! Property tests for date range resolution and period comparison.

#![allow(clippy::panic)]

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use tenant_analytics::domain::Preset;
use tenant_analytics::domain::range::{resolve_range, year_bounds};
use tenant_analytics::domain::trend::{percent_change, previous_window};

fn preset() -> impl Strategy<Value = Preset> {
    prop::sample::select(Preset::ALL.to_vec())
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2040, 1u32..=366).prop_map(|(year, ordinal)| {
        NaiveDate::from_yo_opt(year, ordinal)
            .or_else(|| NaiveDate::from_yo_opt(year, 365))
            .unwrap_or_default()
    })
}

fn instant() -> impl Strategy<Value = NaiveDateTime> {
    (date(), 0u32..86_400).prop_map(|(day, secs)| {
        day.and_hms_opt(secs / 3600, (secs / 60) % 60, secs % 60)
            .unwrap_or_default()
    })
}

proptest! {
    #[test]
    fn resolved_range_is_ordered_and_inside_year(
        year in 1990i32..2040,
        preset in preset(),
        start in prop::option::of(date()),
        end in prop::option::of(date()),
        now in instant(),
    ) {
        let range = resolve_range(year, preset, start, end, now);
        let bounds = year_bounds(year);
        prop_assert!(range.start <= range.end);
        prop_assert!(range.start >= bounds.start);
        prop_assert!(range.end <= bounds.end);
        prop_assert_eq!(range.start.year(), year);
    }

    #[test]
    fn non_custom_range_never_passes_now(
        year in 1990i32..2040,
        preset in prop::sample::select(vec![
            Preset::YearToDate,
            Preset::Last30Days,
            Preset::QuarterToDate,
        ]),
        now in instant(),
    ) {
        let range = resolve_range(year, preset, None, None, now);
        if now.year() == year {
            prop_assert_eq!(range.end, now);
        } else {
            prop_assert_eq!(range.end, year_bounds(year).end);
        }
    }

    #[test]
    fn previous_window_precedes_and_matches_length(
        year in 1990i32..2040,
        preset in preset(),
        now in instant(),
    ) {
        let range = resolve_range(year, preset, None, None, now);
        let Some(previous) = previous_window(&range) else {
            panic!("every resolved range has a predecessor");
        };
        prop_assert!(previous.end < range.start);
        prop_assert!(previous.start <= previous.end);
        prop_assert_eq!(previous.calendar_days(), range.calendar_days());
    }

    #[test]
    fn percent_change_sign_follows_direction(
        current in 0.0f64..1.0e9,
        previous in 0.01f64..1.0e9,
    ) {
        let Some(change) = percent_change(current, previous, 2) else {
            panic!("non-zero baseline must yield a change");
        };
        if current > previous * 1.0001 {
            prop_assert!(change >= 0.0);
        }
        if current < previous * 0.9999 {
            prop_assert!(change <= 0.0);
        }
        prop_assert!(change >= -100.0);
    }
}
