//! Fleet utilization math.
//!
//! A car is *active* at a reference instant when one of its counted bookings
//! spans that instant. *Unavailable* cars are the cars whose availability
//! status marks them out of service, whether or not they are out on a
//! booking. *Available* is what is left of the fleet, never negative.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::CarId;
use super::trend::round_f64;

/// Availability statuses that take a car out of the rentable pool.
pub const UNAVAILABLE_STATUSES: [&str; 5] =
    ["maintenance", "out_of_service", "inactive", "workshop", "repair"];

/// Label used for cars without a vehicle class.
pub const UNSPECIFIED_CLASS: &str = "Unspecified";

/// Whether a free-form availability status marks a car out of service.
///
/// Comparison trims, ignores case and treats `-` and spaces as `_`.
#[must_use]
pub fn is_unavailable_status(status: &str) -> bool {
    let normalized: String = status
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    UNAVAILABLE_STATUSES.contains(&normalized.as_str())
}

/// A booking reduced to the span during which it occupies its car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    /// Occupied car.
    pub car_id: CarId,
    /// Pickup time.
    pub start: NaiveDateTime,
    /// Completion reference of the booking.
    pub until: NaiveDateTime,
}

impl Occupancy {
    /// `start <= at <= until`.
    #[must_use]
    pub fn covers(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.until
    }
}

/// One car's state at the reference instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarSnapshot {
    /// Car key.
    pub car_id: CarId,
    /// Vehicle class label, if any.
    pub vehicle_class: Option<String>,
    /// Free-form availability status.
    pub availability_status: String,
    /// Out on a booking at the reference instant.
    pub active: bool,
}

/// Fleet headcount by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FleetCounts {
    /// Cars in scope.
    pub fleet_size: i64,
    /// Cars out on a booking.
    pub active: i64,
    /// `fleet_size - active - unavailable`, floored at zero.
    pub available: i64,
    /// Cars whose availability status marks them out of service.
    pub unavailable: i64,
}

/// Utilization expressed both as a ratio and as display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UtilizationRate {
    /// `active / fleet_size`, four decimals; 0 for an empty fleet.
    pub rate: f64,
    /// Rate as a percentage with one decimal, e.g. `"62.5%"`.
    pub percent: String,
}

impl UtilizationRate {
    /// Computes the rate for `active` of `fleet_size` cars.
    #[must_use]
    pub fn of(active: i64, fleet_size: i64) -> Self {
        let rate = if fleet_size > 0 {
            round_f64(active as f64 / fleet_size as f64, 4)
        } else {
            0.0
        };
        Self {
            rate,
            percent: format!("{:.1}%", round_f64(rate * 100.0, 1)),
        }
    }
}

/// Utilization of one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassUtilization {
    /// Vehicle class label.
    pub vehicle_class: String,
    /// Cars of this class.
    pub fleet_size: i64,
    /// Active cars of this class.
    pub active: i64,
    /// Class utilization.
    #[serde(flatten)]
    pub utilization: UtilizationRate,
}

/// Display class of a car; blank or missing labels become [`UNSPECIFIED_CLASS`].
#[must_use]
pub fn class_label(vehicle_class: Option<&str>) -> &str {
    vehicle_class
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNSPECIFIED_CLASS)
}

/// Occupancies grouped by car, so activity checks only scan one car's
/// bookings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyIndex {
    by_car: BTreeMap<CarId, Vec<Occupancy>>,
}

impl OccupancyIndex {
    /// Whether `car` has an occupancy covering `at`.
    #[must_use]
    pub fn is_active(&self, car: CarId, at: NaiveDateTime) -> bool {
        self.by_car
            .get(&car)
            .is_some_and(|spans| spans.iter().any(|o| o.covers(at)))
    }
}

impl FromIterator<Occupancy> for OccupancyIndex {
    fn from_iter<I: IntoIterator<Item = Occupancy>>(iter: I) -> Self {
        let mut by_car: BTreeMap<CarId, Vec<Occupancy>> = BTreeMap::new();
        for occupancy in iter {
            by_car.entry(occupancy.car_id).or_default().push(occupancy);
        }
        Self { by_car }
    }
}

/// Number of `cars` with an occupancy covering `at`.
#[must_use]
pub fn active_count(cars: &[CarId], occupancies: &OccupancyIndex, at: NaiveDateTime) -> i64 {
    cars.iter()
        .filter(|car| occupancies.is_active(**car, at))
        .count() as i64
}

/// Marks each car active when any occupancy covers `reference`.
#[must_use]
pub fn mark_active<'a, I>(
    cars: I,
    occupancies: &OccupancyIndex,
    reference: NaiveDateTime,
) -> Vec<CarSnapshot>
where
    I: IntoIterator<Item = (CarId, Option<&'a str>, &'a str)>,
{
    cars.into_iter()
        .map(|(car_id, class, status)| CarSnapshot {
            car_id,
            vehicle_class: class.map(str::to_string),
            availability_status: status.to_string(),
            active: occupancies.is_active(car_id, reference),
        })
        .collect()
}

/// Counts active, available and unavailable cars.
///
/// A car out on a booking while flagged for maintenance counts in both
/// `active` and `unavailable`.
#[must_use]
pub fn count_fleet(cars: &[CarSnapshot]) -> FleetCounts {
    let fleet_size = cars.len() as i64;
    let active = cars.iter().filter(|c| c.active).count() as i64;
    let unavailable = cars
        .iter()
        .filter(|c| is_unavailable_status(&c.availability_status))
        .count() as i64;
    FleetCounts {
        fleet_size,
        active,
        available: (fleet_size - active - unavailable).max(0),
        unavailable,
    }
}

/// Per-class utilization, highest rate first, then by class name.
#[must_use]
pub fn class_breakdown(cars: &[CarSnapshot]) -> Vec<ClassUtilization> {
    let mut classes: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for car in cars {
        let class = class_label(car.vehicle_class.as_deref());
        let entry = classes.entry(class.to_string()).or_default();
        entry.0 += 1;
        if car.active {
            entry.1 += 1;
        }
    }

    let mut breakdown: Vec<ClassUtilization> = classes
        .into_iter()
        .map(|(vehicle_class, (fleet_size, active))| ClassUtilization {
            vehicle_class,
            fleet_size,
            active,
            utilization: UtilizationRate::of(active, fleet_size),
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.utilization
            .rate
            .total_cmp(&a.utilization.rate)
            .then_with(|| a.vehicle_class.cmp(&b.vehicle_class))
    });
    breakdown
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        let Some(t) = NaiveDate::from_ymd_opt(2026, 10, d).and_then(|d| d.and_hms_opt(h, 0, 0))
        else {
            panic!("invalid fixture time");
        };
        t
    }

    fn car(id: i64, class: Option<&str>, status: &str, active: bool) -> CarSnapshot {
        CarSnapshot {
            car_id: CarId::new(id),
            vehicle_class: class.map(str::to_string),
            availability_status: status.to_string(),
            active,
        }
    }

    #[test]
    fn unavailable_status_matching_is_lenient() {
        assert!(is_unavailable_status("Maintenance"));
        assert!(is_unavailable_status(" out-of-service "));
        assert!(is_unavailable_status("Out Of Service"));
        assert!(!is_unavailable_status("available"));
        assert!(!is_unavailable_status("rented"));
    }

    #[test]
    fn active_car_in_maintenance_is_also_unavailable() {
        let cars = vec![
            car(1, Some("SUV"), "maintenance", true),
            car(2, Some("SUV"), "maintenance", false),
            car(3, Some("Sedan"), "available", false),
            car(4, None, "available", true),
        ];
        let counts = count_fleet(&cars);
        assert_eq!(
            counts,
            FleetCounts {
                fleet_size: 4,
                active: 2,
                available: 0,
                unavailable: 2,
            }
        );
    }

    #[test]
    fn available_never_goes_negative() {
        let cars = vec![
            car(1, None, "repair", true),
            car(2, None, "Out-Of-Service", true),
            car(3, None, "workshop", false),
        ];
        let counts = count_fleet(&cars);
        assert_eq!(counts.active, 2);
        assert_eq!(counts.unavailable, 3);
        assert_eq!(counts.available, 0);
    }

    #[test]
    fn rate_formats_one_decimal_percent() {
        let r = UtilizationRate::of(5, 8);
        assert_eq!(r.rate, 0.625);
        assert_eq!(r.percent, "62.5%");
        let r = UtilizationRate::of(1, 3);
        assert_eq!(r.rate, 0.3333);
        assert_eq!(r.percent, "33.3%");
        let r = UtilizationRate::of(0, 0);
        assert_eq!(r.rate, 0.0);
        assert_eq!(r.percent, "0.0%");
    }

    #[test]
    fn breakdown_sorts_by_rate_then_name() {
        let cars = vec![
            car(1, Some("Van"), "available", false),
            car(2, Some("SUV"), "available", true),
            car(3, None, "available", true),
            car(4, Some("  "), "available", false),
            car(5, Some("Sedan"), "available", false),
        ];
        let names: Vec<String> = class_breakdown(&cars)
            .into_iter()
            .map(|c| c.vehicle_class)
            .collect();
        assert_eq!(names, vec!["SUV", "Unspecified", "Sedan", "Van"]);
    }

    #[test]
    fn occupancy_bounds_are_inclusive() {
        let o = Occupancy {
            car_id: CarId::new(1),
            start: at(10, 8),
            until: at(12, 8),
        };
        assert!(o.covers(at(10, 8)));
        assert!(o.covers(at(12, 8)));
        assert!(!o.covers(at(12, 9)));
    }

    #[test]
    fn active_count_ignores_cars_outside_fleet() {
        let occupancies = [
            Occupancy {
                car_id: CarId::new(1),
                start: at(10, 8),
                until: at(12, 8),
            },
            Occupancy {
                car_id: CarId::new(9),
                start: at(10, 8),
                until: at(12, 8),
            },
        ];
        let index: OccupancyIndex = occupancies.into_iter().collect();
        let fleet = [CarId::new(1), CarId::new(2)];
        assert_eq!(active_count(&fleet, &index, at(11, 0)), 1);
        assert_eq!(active_count(&fleet, &index, at(13, 0)), 0);
    }

    #[test]
    fn index_keeps_every_span_of_a_car() {
        let index: OccupancyIndex = [
            Occupancy {
                car_id: CarId::new(3),
                start: at(1, 8),
                until: at(2, 8),
            },
            Occupancy {
                car_id: CarId::new(3),
                start: at(20, 8),
                until: at(22, 8),
            },
        ]
        .into_iter()
        .collect();
        assert!(index.is_active(CarId::new(3), at(1, 12)));
        assert!(index.is_active(CarId::new(3), at(21, 0)));
        assert!(!index.is_active(CarId::new(3), at(10, 0)));
        assert!(!index.is_active(CarId::new(4), at(21, 0)));
    }

    #[test]
    fn mark_active_matches_car_and_instant() {
        let occupancies = [Occupancy {
            car_id: CarId::new(2),
            start: at(10, 8),
            until: at(12, 8),
        }];
        let fleet = [
            (CarId::new(1), Some("SUV"), "available"),
            (CarId::new(2), None, "available"),
        ];
        let index: OccupancyIndex = occupancies.into_iter().collect();
        let snapshots = mark_active(fleet, &index, at(11, 0));
        let active: Vec<bool> = snapshots.iter().map(|s| s.active).collect();
        assert_eq!(active, vec![false, true]);
    }
}
