//! Dashboard filter normalization.
//!
//! Every dashboard endpoint accepts the same loosely-typed query string.
//! [`normalize`] turns it into a [`DashboardFilter`] where every field has a
//! value, so downstream code never deals with "missing". Malformed values
//! are treated as absent and replaced by their default; normalization never
//! fails.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use super::ids::{CarId, CompanyId};
use super::records::BookingStatus;

/// Earliest year a filter may address.
pub const MIN_YEAR: i32 = 1970;
/// Latest year a filter may address.
pub const MAX_YEAR: i32 = 9999;
/// Widest multi-year span the monthly sales report serves.
pub const MAX_YEAR_SPAN: i32 = 10;

/// Booking date columns tried in order to find when a booking finished.
pub const COMPLETION_REFERENCE: &[&str] = &[
    "actual_return_date",
    "end_date",
    "expected_return_date",
    "start_date",
];

/// Named time window relative to the requested year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    /// January 1 up to now (or year end for past years).
    #[default]
    YearToDate,
    /// The 30 calendar days ending now.
    Last30Days,
    /// First day of the current quarter up to now.
    QuarterToDate,
    /// Caller-supplied `start_date` / `end_date`.
    Custom,
}

impl Preset {
    /// Every preset, in catalog order.
    pub const ALL: [Self; 4] = [
        Self::YearToDate,
        Self::Last30Days,
        Self::QuarterToDate,
        Self::Custom,
    ];

    /// Canonical query-string spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YearToDate => "year_to_date",
            Self::Last30Days => "last_30_days",
            Self::QuarterToDate => "quarter_to_date",
            Self::Custom => "custom",
        }
    }

    /// Parses a preset name, accepting a few short aliases.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "year_to_date" | "ytd" => Some(Self::YearToDate),
            "last_30_days" | "last30" | "30d" => Some(Self::Last30Days),
            "quarter_to_date" | "qtd" => Some(Self::QuarterToDate),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Sampling step for the fleet utilization timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    /// One sample per day.
    #[default]
    Day,
    /// One sample per hour.
    Hour,
}

impl Granularity {
    /// Canonical query-string spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Hour => "hour",
        }
    }

    /// Parses `day`/`daily` or `hour`/`hourly`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Some(Self::Day),
            "hour" | "hourly" => Some(Self::Hour),
            _ => None,
        }
    }
}

/// Which booking date places a booking inside the reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateField {
    /// Actual return, falling back to the scheduled end.
    #[default]
    ActualReturn,
    /// Scheduled end.
    EndDate,
    /// Expected return, falling back to the scheduled end.
    ExpectedReturn,
    /// Pickup time.
    StartDate,
}

impl DateField {
    /// Every date field, in catalog order.
    pub const ALL: [Self; 4] = [
        Self::ActualReturn,
        Self::EndDate,
        Self::ExpectedReturn,
        Self::StartDate,
    ];

    /// Canonical query-string spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActualReturn => "actual_return",
            Self::EndDate => "end_date",
            Self::ExpectedReturn => "expected_return",
            Self::StartDate => "start_date",
        }
    }

    /// Columns combined with `COALESCE`, primary first.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::ActualReturn => &["actual_return_date", "end_date"],
            Self::EndDate => &["end_date"],
            Self::ExpectedReturn => &["expected_return_date", "end_date"],
            Self::StartDate => &["start_date"],
        }
    }

    /// Parses a date field name or its column name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "actual_return" | "actual_return_date" => Some(Self::ActualReturn),
            "end_date" | "end" => Some(Self::EndDate),
            "expected_return" | "expected_return_date" => Some(Self::ExpectedReturn),
            "start_date" | "start" => Some(Self::StartDate),
            _ => None,
        }
    }
}

/// Query parameters as received, grouped by key.
///
/// `status[]=a&status[]=b`, `status=a&status=b` and `status=a,b` all land
/// under the `status` key.
#[derive(Debug, Clone, Default)]
pub struct RawFilters {
    values: BTreeMap<String, Vec<String>>,
}

impl RawFilters {
    /// Parses an `application/x-www-form-urlencoded` query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    /// Builds the map from already-decoded key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.as_ref().trim().trim_end_matches("[]").to_ascii_lowercase();
            values.entry(key).or_default().push(value.into());
        }
        Self { values }
    }

    /// Last non-blank value for `key`.
    fn scalar(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)?
            .iter()
            .rev()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// All values for `key`, splitting comma-separated entries.
    fn list(&self, key: &str) -> Vec<&str> {
        self.values
            .get(key)
            .into_iter()
            .flatten()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Defaults that depend on the deployment and the request time.
#[derive(Debug, Clone, Copy)]
pub struct FilterDefaults {
    /// Zone used when the request names none (or an unknown one).
    pub timezone: Tz,
    /// Request time.
    pub now: DateTime<Utc>,
}

/// Canonical, fully-defaulted dashboard filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardFilter {
    /// Calendar year being reported on.
    pub year: i32,
    /// Narrow to one owned company.
    pub company_id: Option<CompanyId>,
    /// Narrow to one car.
    pub car_id: Option<CarId>,
    /// Booking statuses counted; sorted, deduplicated, never `Cancelled`.
    pub statuses: Vec<BookingStatus>,
    /// Booking date that places a booking in the window.
    pub date_field: DateField,
    /// Take revenue from settled payments instead of booking totals.
    pub use_payments: bool,
    /// Named window.
    pub preset: Preset,
    /// First day of a custom window; only set for [`Preset::Custom`].
    pub custom_start: Option<NaiveDate>,
    /// Last day of a custom window; only set for [`Preset::Custom`].
    pub custom_end: Option<NaiveDate>,
    /// Attach a previous-period comparison.
    pub include_trend: bool,
    /// Attach the preceding months to the monthly sales series.
    pub include_previous: bool,
    /// Upper-cased ISO 4217 override for the reported currency.
    pub currency: Option<String>,
    /// Zone wall-clock times are expressed in.
    pub timezone: Tz,
    /// Utilization timeline step.
    pub granularity: Granularity,
    /// First year of a monthly sales span.
    pub start_year: i32,
    /// Last year of a monthly sales span.
    pub end_year: i32,
    /// Row cap for list endpoints; each endpoint applies its own bounds.
    pub limit: Option<u32>,
}

impl DashboardFilter {
    /// Request time as wall-clock in the filter's zone.
    #[must_use]
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.timezone).naive_local()
    }

    /// Every result-affecting field in canonical text form, keyed by name.
    ///
    /// Two filters that compare equal produce the same map, which is what
    /// makes cache keys independent of how the query string was spelled.
    #[must_use]
    pub fn fingerprint(&self) -> BTreeMap<&'static str, String> {
        fn opt<T: ToString>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_default()
        }

        let statuses = self
            .statuses
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");

        BTreeMap::from([
            ("year", self.year.to_string()),
            ("company_id", opt(self.company_id)),
            ("car_id", opt(self.car_id)),
            ("statuses", statuses),
            ("date_field", self.date_field.as_str().to_string()),
            ("use_payments", self.use_payments.to_string()),
            ("preset", self.preset.as_str().to_string()),
            ("custom_start", opt(self.custom_start)),
            ("custom_end", opt(self.custom_end)),
            ("include_trend", self.include_trend.to_string()),
            ("include_previous", self.include_previous.to_string()),
            ("currency", self.currency.clone().unwrap_or_default()),
            ("timezone", self.timezone.name().to_string()),
            ("granularity", self.granularity.as_str().to_string()),
            ("start_year", self.start_year.to_string()),
            ("end_year", self.end_year.to_string()),
            ("limit", opt(self.limit)),
        ])
    }
}

/// Parses a tolerant boolean: `true/false`, `1/0`, `yes/no`, `on/off`.
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Normalizes raw query parameters into a [`DashboardFilter`].
#[must_use]
pub fn normalize(raw: &RawFilters, defaults: &FilterDefaults) -> DashboardFilter {
    let timezone = raw
        .scalar("timezone")
        .and_then(|tz| tz.parse::<Tz>().ok())
        .unwrap_or(defaults.timezone);
    let current_year = defaults.now.with_timezone(&timezone).year();
    let year = raw.scalar("year").and_then(parse_year).unwrap_or(current_year);

    let preset = raw
        .scalar("preset")
        .and_then(Preset::parse)
        .unwrap_or_default();
    let (custom_start, custom_end) = if preset == Preset::Custom {
        (
            raw.scalar("start_date").and_then(parse_date),
            raw.scalar("end_date").and_then(parse_date),
        )
    } else {
        (None, None)
    };

    let mut requested = raw.list("status");
    requested.extend(raw.list("statuses"));

    let (start_year, end_year) = year_span(
        raw.scalar("start_year").and_then(parse_year),
        raw.scalar("end_year").and_then(parse_year),
        year,
    );

    DashboardFilter {
        year,
        company_id: raw.scalar("company_id").and_then(parse_key).map(CompanyId::new),
        car_id: raw.scalar("car_id").and_then(parse_key).map(CarId::new),
        statuses: normalize_statuses(&requested),
        date_field: raw
            .scalar("date_field")
            .and_then(DateField::parse)
            .unwrap_or_default(),
        use_payments: flag(raw, "use_payments"),
        preset,
        custom_start,
        custom_end,
        include_trend: flag(raw, "include_trend"),
        include_previous: flag(raw, "include_previous"),
        currency: raw.scalar("currency").and_then(parse_currency),
        timezone,
        granularity: raw
            .scalar("granularity")
            .and_then(Granularity::parse)
            .unwrap_or_default(),
        start_year,
        end_year,
        limit: raw
            .scalar("limit")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0),
    }
}

fn flag(raw: &RawFilters, key: &str) -> bool {
    raw.scalar(key).and_then(parse_flag).unwrap_or(false)
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.parse::<i32>()
        .ok()
        .filter(|y| (MIN_YEAR..=MAX_YEAR).contains(y))
}

fn parse_key(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|v| *v > 0)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_currency(raw: &str) -> Option<String> {
    (raw.len() == 3 && raw.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| raw.to_ascii_uppercase())
}

fn normalize_statuses(requested: &[&str]) -> Vec<BookingStatus> {
    let mut statuses: Vec<BookingStatus> = requested
        .iter()
        .filter_map(|s| BookingStatus::parse(s))
        .filter(|s| *s != BookingStatus::Cancelled)
        .collect();
    statuses.sort();
    statuses.dedup();
    if statuses.is_empty() {
        BookingStatus::DEFAULT_SET.to_vec()
    } else {
        statuses
    }
}

fn year_span(start: Option<i32>, end: Option<i32>, year: i32) -> (i32, i32) {
    let mut start = start.unwrap_or(year);
    let mut end = end.unwrap_or(year);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    if end - start >= MAX_YEAR_SPAN {
        start = end - (MAX_YEAR_SPAN - 1);
    }
    (start, end)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn defaults() -> FilterDefaults {
        let Some(now) = Utc.with_ymd_and_hms(2026, 10, 17, 4, 0, 0).single() else {
            panic!("invalid fixture instant");
        };
        FilterDefaults {
            timezone: chrono_tz::Asia::Manila,
            now,
        }
    }

    fn run(query: &str) -> DashboardFilter {
        normalize(&RawFilters::from_query(query), &defaults())
    }

    #[test]
    fn empty_query_gets_every_default() {
        let f = run("");
        assert_eq!(f.year, 2026);
        assert_eq!(f.company_id, None);
        assert_eq!(f.statuses, BookingStatus::DEFAULT_SET.to_vec());
        assert_eq!(f.date_field, DateField::ActualReturn);
        assert_eq!(f.preset, Preset::YearToDate);
        assert!(!f.use_payments);
        assert!(!f.include_trend);
        assert_eq!(f.timezone, chrono_tz::Asia::Manila);
        assert_eq!(f.granularity, Granularity::Day);
        assert_eq!((f.start_year, f.end_year), (2026, 2026));
        assert_eq!(f.limit, None);
    }

    #[test]
    fn flags_accept_tolerant_spellings() {
        assert!(run("use_payments=1").use_payments);
        assert!(run("use_payments=YES").use_payments);
        assert!(run("use_payments=on").use_payments);
        assert!(!run("use_payments=off").use_payments);
        assert!(!run("use_payments=maybe").use_payments);
    }

    #[test]
    fn equivalent_spellings_normalize_equal() {
        let a = run("include_trend=1&status[]=completed&status[]=ongoing&year=2024");
        let b = run("year=2024&statuses=Ongoing,Completed&include_trend=true");
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn cancelled_is_never_kept() {
        let f = run("status[]=cancelled&status[]=completed");
        assert_eq!(f.statuses, vec![BookingStatus::Completed]);
    }

    #[test]
    fn only_invalid_statuses_fall_back_to_default() {
        assert_eq!(run("status=cancelled").statuses, BookingStatus::DEFAULT_SET.to_vec());
        assert_eq!(run("status=bogus").statuses, BookingStatus::DEFAULT_SET.to_vec());
    }

    #[test]
    fn custom_bounds_only_kept_for_custom_preset() {
        let f = run("preset=custom&start_date=2024-02-01&end_date=2024-02-29");
        assert_eq!(f.custom_start, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(f.custom_end, NaiveDate::from_ymd_opt(2024, 2, 29));

        let f = run("preset=last_30_days&start_date=2024-02-01");
        assert_eq!(f.preset, Preset::Last30Days);
        assert_eq!(f.custom_start, None);
    }

    #[test]
    fn unknown_values_fall_back() {
        let f = run("preset=fortnight&date_field=created_at&granularity=minute&timezone=Mars/Olympus&year=abc");
        assert_eq!(f.preset, Preset::YearToDate);
        assert_eq!(f.date_field, DateField::ActualReturn);
        assert_eq!(f.granularity, Granularity::Day);
        assert_eq!(f.timezone, chrono_tz::Asia::Manila);
        assert_eq!(f.year, 2026);
    }

    #[test]
    fn currency_must_be_three_letters() {
        assert_eq!(run("currency=usd").currency.as_deref(), Some("USD"));
        assert_eq!(run("currency=dollars").currency, None);
        assert_eq!(run("currency=U5D").currency, None);
    }

    #[test]
    fn ids_and_limit_must_be_positive() {
        let f = run("company_id=0&car_id=-3&limit=0");
        assert_eq!(f.company_id, None);
        assert_eq!(f.car_id, None);
        assert_eq!(f.limit, None);
        let f = run("company_id=12&car_id=7&limit=25");
        assert_eq!(f.company_id, Some(CompanyId::new(12)));
        assert_eq!(f.car_id, Some(CarId::new(7)));
        assert_eq!(f.limit, Some(25));
    }

    #[test]
    fn year_span_is_ordered_and_capped() {
        let f = run("start_year=2024&end_year=2020");
        assert_eq!((f.start_year, f.end_year), (2020, 2024));
        let f = run("start_year=2000&end_year=2024");
        assert_eq!((f.start_year, f.end_year), (2015, 2024));
    }

    #[test]
    fn last_value_wins_for_scalars() {
        assert_eq!(run("year=2023&year=2024&year=").year, 2024);
    }

    #[test]
    fn parse_flag_rejects_garbage() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("2"), None);
    }
}
