//! Great-circle distance and proximity ranking
//!
//! Distances use the spherical law of cosines form of the haversine
//! computation on a sphere of radius [`EARTH_RADIUS_KM`].

use std::cmp::Ordering;
use uuid::Uuid;

use crate::domain::errors::RepositoryError;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Search radius used when the caller does not supply one
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// A validated latitude/longitude pair in decimal degrees
///
/// # Invariants
/// - Both components are finite
/// - Latitude lies in [-90, 90], longitude in [-180, 180]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting non-finite or out-of-range components
    ///
    /// # Example
    /// ```
    /// use pharmacy_directory_api::domain::geo::GeoPoint;
    ///
    /// assert!(GeoPoint::new(51.5, -0.12).is_ok());
    /// assert!(GeoPoint::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, RepositoryError> {
        validate_latitude(latitude)?;
        validate_longitude(longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds a point from two optional components
    ///
    /// Returns `Ok(None)` when both are absent and a validation error when
    /// only one is present.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, RepositoryError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(RepositoryError::validation(
                "latitude and longitude must be supplied together",
            )),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometres
    ///
    /// The `acos` argument is clamped to [-1, 1]. For points a hair apart
    /// the rounded cosine can land just above 1, which would otherwise
    /// produce NaN.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        // cos²φ + sin²φ can round to just under 1
        if self == other {
            return 0.0;
        }

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lon = other.longitude.to_radians() - self.longitude.to_radians();

        let cosine = lat1.cos() * lat2.cos() * delta_lon.cos() + lat1.sin() * lat2.sin();
        EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
    }
}

pub fn validate_latitude(latitude: f64) -> Result<f64, RepositoryError> {
    if latitude.is_finite() && (-90.0..=90.0).contains(&latitude) {
        Ok(latitude)
    } else {
        Err(RepositoryError::validation(format!(
            "latitude must be between -90 and 90, got {}",
            latitude
        )))
    }
}

pub fn validate_longitude(longitude: f64) -> Result<f64, RepositoryError> {
    if longitude.is_finite() && (-180.0..=180.0).contains(&longitude) {
        Ok(longitude)
    } else {
        Err(RepositoryError::validation(format!(
            "longitude must be between -180 and 180, got {}",
            longitude
        )))
    }
}

/// Latitude/longitude rectangle enclosing every point within a radius
///
/// Used to prune candidates before exact ranking. The rectangle is never
/// smaller than the circle; near a pole or across the antimeridian it
/// spans every longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    // Slack for rounding at the edges, roughly a tenth of a millimetre
    const MARGIN_DEGREES: f64 = 1e-9;

    pub fn around(origin: &GeoPoint, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat = origin.latitude.to_radians();
        let min_lat = lat - angular;
        let max_lat = lat + angular;

        let half_pi = std::f64::consts::FRAC_PI_2;
        let spread = angular.sin() / lat.cos();
        let delta_lon = if min_lat > -half_pi && max_lat < half_pi && spread < 1.0 {
            Some(spread.asin().to_degrees())
        } else {
            None
        };

        let (min_longitude, max_longitude) = match delta_lon {
            Some(delta)
                if origin.longitude - delta >= -180.0 && origin.longitude + delta <= 180.0 =>
            {
                (
                    origin.longitude - delta - Self::MARGIN_DEGREES,
                    origin.longitude + delta + Self::MARGIN_DEGREES,
                )
            }
            _ => (-180.0, 180.0),
        };

        Self {
            min_latitude: (min_lat.to_degrees() - Self::MARGIN_DEGREES).max(-90.0),
            max_latitude: (max_lat.to_degrees() + Self::MARGIN_DEGREES).min(90.0),
            min_longitude,
            max_longitude,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

/// Validates a search radius, falling back to [`DEFAULT_RADIUS_KM`]
pub fn radius_or_default(radius_km: Option<f64>) -> Result<f64, RepositoryError> {
    let radius = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if radius.is_finite() && radius >= 0.0 {
        Ok(radius)
    } else {
        Err(RepositoryError::validation(format!(
            "radius must be a non-negative number of kilometres, got {}",
            radius
        )))
    }
}

/// Something with a stable identifier and an optional location
pub trait Located {
    fn id(&self) -> Uuid;
    fn location(&self) -> Option<GeoPoint>;
}

/// Keeps candidates within `radius_km` of `origin`, nearest first
///
/// The boundary is inclusive. Candidates without a location never match.
/// Equal distances are ordered by identifier so results are deterministic.
pub fn rank_within<T, I>(origin: &GeoPoint, radius_km: f64, candidates: I) -> Vec<(T, f64)>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let mut ranked: Vec<(T, f64)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = origin.distance_km(&candidate.location()?);
            (distance <= radius_km).then_some((candidate, distance))
        })
        .collect();

    ranked.sort_by(|(a, da), (b, db)| {
        da.partial_cmp(db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id().cmp(&b.id()))
    });

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Site {
        id: Uuid,
        at: Option<GeoPoint>,
    }

    impl Located for Site {
        fn id(&self) -> Uuid {
            self.id
        }

        fn location(&self) -> Option<GeoPoint> {
            self.at
        }
    }

    fn site(lat: f64, lon: f64) -> Site {
        Site {
            id: Uuid::new_v4(),
            at: Some(GeoPoint::new(lat, lon).unwrap()),
        }
    }

    #[test]
    fn identical_points_are_zero_apart() {
        let p = GeoPoint::new(51.5007, -0.1246).unwrap();
        let d = p.distance_km(&p);
        assert!(!d.is_nan());
        assert_eq!(d, 0.0);
    }

    #[test]
    fn identical_points_never_overshoot_acos_domain() {
        for lat in [-89.9, -45.0, 0.1, 33.3, 48.8566, 89.99] {
            let p = GeoPoint::new(lat, 2.3522).unwrap();
            let q = GeoPoint::new(lat, 2.3522 + 1e-12).unwrap();
            assert!(!p.distance_km(&q).is_nan());
        }
    }

    #[test]
    fn nearly_identical_points_stay_finite() {
        // the raw cosine for this pair rounds to just above 1
        let p = GeoPoint::new(-87.4853, 10.0).unwrap();
        let q = GeoPoint::new(-87.4853, 10.0 + 1e-9).unwrap();

        let d = p.distance_km(&q);
        assert!(d.is_finite(), "got {}", d);
        assert!(d < 0.005, "got {}", d);

        let candidate = Site {
            id: Uuid::new_v4(),
            at: Some(q),
        };
        let ranked = rank_within(&p, 0.001, vec![candidate]);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].1.is_finite());
    }

    #[test]
    fn origin_to_origin_is_zero() {
        let p = GeoPoint::new(0.0, 0.0).unwrap();
        assert_eq!(p.distance_km(&p), 0.0);
    }

    #[test]
    fn london_to_paris_is_about_344_km() {
        let london = GeoPoint::new(51.5074, -0.1278).unwrap();
        let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
        let d = london.distance_km(&paris);
        assert!((d - 343.5).abs() < 2.0, "got {}", d);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 0.0).unwrap();
        assert!((a.distance_km(&b) - 111.19).abs() < 0.1);
    }

    #[test]
    fn antipodes_do_not_produce_nan() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 180.0).unwrap();
        let d = a.distance_km(&b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn from_parts_requires_both_or_neither() {
        assert!(GeoPoint::from_parts(None, None).unwrap().is_none());
        assert!(GeoPoint::from_parts(Some(1.0), Some(2.0)).unwrap().is_some());
        assert!(matches!(
            GeoPoint::from_parts(Some(1.0), None),
            Err(RepositoryError::Validation(_))
        ));
        assert!(GeoPoint::from_parts(None, Some(2.0)).is_err());
    }

    #[test]
    fn radius_defaults_to_ten_km() {
        assert_eq!(radius_or_default(None).unwrap(), 10.0);
        assert_eq!(radius_or_default(Some(0.0)).unwrap(), 0.0);
        assert!(radius_or_default(Some(-1.0)).is_err());
        assert!(radius_or_default(Some(f64::NAN)).is_err());
    }

    #[test]
    fn zero_radius_includes_exact_match() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let ranked = rank_within(&origin, 0.0, vec![site(0.0, 0.0), site(0.001, 0.0)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].1, 0.0);
    }

    #[test]
    fn excludes_far_candidates_and_orders_by_distance() {
        let origin = GeoPoint::new(51.5, -0.12).unwrap();
        let near = site(51.51, -0.12);
        let mid = site(51.55, -0.12);
        let far = site(51.7, -0.12);
        let (near_id, mid_id) = (near.id, mid.id);

        let ranked = rank_within(&origin, 10.0, vec![far, mid, near]);

        let ids: Vec<Uuid> = ranked.iter().map(|(s, _)| s.id).collect();
        assert_eq!(ids, vec![near_id, mid_id]);
        assert!(ranked.windows(2).all(|w| w[0].1 < w[1].1));
        assert!(ranked.iter().all(|(_, d)| *d <= 10.0));
    }

    #[test]
    fn candidates_without_location_never_match() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let nowhere = Site {
            id: Uuid::new_v4(),
            at: None,
        };
        let ranked = rank_within(&origin, 20_000.0, vec![nowhere]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn bounding_box_encloses_every_point_in_radius() {
        let origin = GeoPoint::new(51.5, -0.12).unwrap();
        let radius = 25.0;
        let bbox = BoundingBox::around(&origin, radius);

        for step in 0..72 {
            let bearing = (step as f64 * 5.0).to_radians();
            for fraction in [0.25, 0.5, 0.999] {
                let angular = radius * fraction / EARTH_RADIUS_KM;
                let lat1 = origin.latitude().to_radians();
                let lat2 = (lat1.sin() * angular.cos()
                    + lat1.cos() * angular.sin() * bearing.cos())
                .asin();
                let lon2 = origin.longitude().to_radians()
                    + (bearing.sin() * angular.sin() * lat1.cos())
                        .atan2(angular.cos() - lat1.sin() * lat2.sin());
                let point = GeoPoint::new(lat2.to_degrees(), lon2.to_degrees()).unwrap();

                assert!(origin.distance_km(&point) <= radius);
                assert!(bbox.contains(&point), "{:?} outside {:?}", point, bbox);
            }
        }

        assert!(!bbox.contains(&GeoPoint::new(51.8, -0.12).unwrap()));
        assert!(!bbox.contains(&GeoPoint::new(51.5, 0.5).unwrap()));
    }

    #[test]
    fn zero_radius_box_contains_its_origin() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let bbox = BoundingBox::around(&origin, 0.0);
        assert!(bbox.contains(&origin));
        assert!(!bbox.contains(&GeoPoint::new(0.001, 0.0).unwrap()));
    }

    #[test]
    fn bounding_box_widens_near_poles_and_antimeridian() {
        let polar = BoundingBox::around(&GeoPoint::new(89.99, 10.0).unwrap(), 5.0);
        assert_eq!((polar.min_longitude, polar.max_longitude), (-180.0, 180.0));
        assert_eq!(polar.max_latitude, 90.0);

        let dateline = BoundingBox::around(&GeoPoint::new(0.0, 179.99).unwrap(), 5.0);
        assert!(dateline.contains(&GeoPoint::new(0.0, -179.99).unwrap()));

        let whole_earth = BoundingBox::around(&GeoPoint::new(10.0, 10.0).unwrap(), 25_000.0);
        assert_eq!(whole_earth.min_latitude, -90.0);
        assert_eq!(whole_earth.max_latitude, 90.0);
    }

    #[test]
    fn ties_are_broken_by_id() {
        let origin = GeoPoint::new(10.0, 10.0).unwrap();
        let a = site(10.0, 10.0);
        let b = site(10.0, 10.0);
        let mut expected = vec![a.id, b.id];
        expected.sort();

        let ranked = rank_within(&origin, 1.0, vec![b, a]);
        let ids: Vec<Uuid> = ranked.iter().map(|(s, _)| s.id).collect();
        assert_eq!(ids, expected);
    }
}
