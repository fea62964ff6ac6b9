//! WGS84 point handling and great-circle distances.

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Mean Earth radius (IUGG), in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Half the Earth's circumference: no two points are farther apart.
pub const MAX_SURFACE_DISTANCE_METERS: f64 = std::f64::consts::PI * EARTH_RADIUS_METERS;

/// A validated longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Degrees east, in `[-180, 180]`.
    pub longitude: f64,
    /// Degrees north, in `[-90, 90]`.
    pub latitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(longitude: f64, latitude: f64) -> AppResult<Self> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(AppError::Validation(
                "Coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::Validation(format!(
                "Longitude {longitude} is outside [-180, 180]"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::Validation(format!(
                "Latitude {latitude} is outside [-90, 90]"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Haversine distance to another point, in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }

    /// Smallest lat/lon rectangle containing every point within `radius_m`.
    #[must_use]
    pub fn bounding_box(&self, radius_m: f64) -> BoundingBox {
        let angular = radius_m / EARTH_RADIUS_METERS;
        let d_lat = angular.to_degrees();
        let min_lat = self.latitude - d_lat;
        let max_lat = self.latitude + d_lat;

        // Near the poles (or for huge radii) every meridian is reachable.
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return BoundingBox {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                lon_ranges: vec![(-180.0, 180.0)],
            };
        }

        let ratio = angular.sin() / self.latitude.to_radians().cos();
        if ratio >= 1.0 {
            return BoundingBox {
                min_lat,
                max_lat,
                lon_ranges: vec![(-180.0, 180.0)],
            };
        }

        let d_lon = ratio.asin().to_degrees();
        let min_lon = self.longitude - d_lon;
        let max_lon = self.longitude + d_lon;

        let lon_ranges = if min_lon < -180.0 {
            vec![(min_lon + 360.0, 180.0), (-180.0, max_lon)]
        } else if max_lon > 180.0 {
            vec![(min_lon, 180.0), (-180.0, max_lon - 360.0)]
        } else {
            vec![(min_lon, max_lon)]
        };

        BoundingBox {
            min_lat,
            max_lat,
            lon_ranges,
        }
    }
}

/// Prefilter rectangle for proximity queries.
///
/// Longitude is split into two ranges when the box crosses the antimeridian.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Inclusive `(west, east)` longitude ranges.
    pub lon_ranges: Vec<(f64, f64)>,
}
