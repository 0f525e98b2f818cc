//! Great-circle distance between coordinate pairs.

use fusion_core::DistanceUnit;

use crate::types::{Business, Coordinates};

/// Decimal places kept on computed distances.
pub const DISTANCE_DECIMAL_PLACES: i32 = 2;

/// Haversine distance from `a` to `b`, rounded to two decimals.
///
/// Returns NaN when either point is unset. Zero is a real distance and is
/// never used as a fallback.
#[must_use]
pub fn distance_between(a: Coordinates, b: Coordinates, unit: DistanceUnit) -> f64 {
    if !a.is_set() || !b.is_set() {
        return f64::NAN;
    }

    let d_lat = (a.latitude - b.latitude).to_radians();
    let d_lon = (a.longitude - b.longitude).to_radians();
    let lat_cosines = a.latitude.to_radians().cos() * b.latitude.to_radians().cos();
    let h = (d_lat / 2.0).sin().powi(2) + lat_cosines * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    round_to(unit.earth_radius() * c, DISTANCE_DECIMAL_PLACES)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

impl Business {
    /// Distance from this business to `origin`; NaN if either is unset.
    #[must_use]
    pub fn distance_to(&self, origin: Coordinates, unit: DistanceUnit) -> f64 {
        distance_between(self.coordinates, origin, unit)
    }
}

/// Sets `distance_away` on every record relative to `origin`.
///
/// With no usable origin the records are left untouched, including any
/// distance a previous call stored.
pub fn annotate_distances(
    records: &mut [Business],
    origin: Option<Coordinates>,
    unit: DistanceUnit,
) {
    let Some(origin) = origin.filter(Coordinates::is_set) else {
        return;
    };
    for record in records {
        record.distance_away = record.distance_to(origin, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business_at(lat: f64, lon: f64) -> Business {
        Business {
            id: "b".to_owned(),
            coordinates: Coordinates::new(lat, lon),
            ..Business::default()
        }
    }

    #[test]
    fn same_point_is_zero() {
        for (lat, lon) in [(0.0, 0.0), (32.7767, -96.797), (-33.86, 151.2), (90.0, 180.0)] {
            let p = Coordinates::new(lat, lon);
            assert_eq!(distance_between(p, p, DistanceUnit::Miles), 0.0);
            assert_eq!(distance_between(p, p, DistanceUnit::Kilometers), 0.0);
        }
    }

    #[test]
    fn unset_point_gives_nan() {
        let b = Coordinates::new(10.0, 10.0);
        assert!(distance_between(Coordinates::default(), b, DistanceUnit::Miles).is_nan());
        assert!(distance_between(b, Coordinates::new(f64::NAN, 3.0), DistanceUnit::Miles).is_nan());
    }

    #[test]
    fn dallas_to_austin_matches_known_distance() {
        let dallas = Coordinates::new(32.7767, -96.7970);
        let austin = Coordinates::new(30.2672, -97.7431);
        let miles = distance_between(dallas, austin, DistanceUnit::Miles);
        let km = distance_between(dallas, austin, DistanceUnit::Kilometers);
        assert!((180.0..185.0).contains(&miles), "got {miles}");
        assert!((290.0..298.0).contains(&km), "got {km}");
    }

    #[test]
    fn distance_is_symmetric_and_rounded() {
        let a = Coordinates::new(40.7128, -74.0060);
        let b = Coordinates::new(34.0522, -118.2437);
        let ab = distance_between(a, b, DistanceUnit::Kilometers);
        let ba = distance_between(b, a, DistanceUnit::Kilometers);
        assert_eq!(ab, ba);
        assert_eq!(ab, (ab * 100.0).round() / 100.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance_between(
            Coordinates::new(0.0, 0.0),
            Coordinates::new(0.0, 1.0),
            DistanceUnit::Kilometers,
        );
        // 6371 * pi / 180
        assert_eq!(d, 111.19);
    }

    #[test]
    fn annotate_sets_every_record() {
        let mut records = vec![business_at(0.0, 0.0), business_at(0.0, 1.0)];
        annotate_distances(
            &mut records,
            Some(Coordinates::new(0.0, 0.0)),
            DistanceUnit::Kilometers,
        );
        assert_eq!(records[0].distance_away, 0.0);
        assert_eq!(records[1].distance_away, 111.19);
    }

    #[test]
    fn annotate_without_origin_keeps_previous_values() {
        let mut records = vec![business_at(1.0, 1.0)];
        records[0].distance_away = 12.5;
        annotate_distances(&mut records, None, DistanceUnit::Miles);
        assert_eq!(records[0].distance_away, 12.5);
        annotate_distances(&mut records, Some(Coordinates::default()), DistanceUnit::Miles);
        assert_eq!(records[0].distance_away, 12.5);
    }

    #[test]
    fn annotate_marks_records_without_coordinates_unknown() {
        let mut records = vec![Business::default()];
        annotate_distances(
            &mut records,
            Some(Coordinates::new(5.0, 5.0)),
            DistanceUnit::Miles,
        );
        assert!(records[0].distance_away.is_nan());
    }
}
