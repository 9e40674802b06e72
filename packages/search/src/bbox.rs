//! Conservative rectangular over-cover of a radius query.
//!
//! The box restricts the store scan to an indexed range over `lat` and
//! `lng` before any exact distance is computed. It is a superset filter:
//! it may admit rows farther than the radius, but it must never exclude a
//! row genuinely within it.

use std::f64::consts::FRAC_PI_2;

use zip_atlas_models::Unit;

/// Inflation applied to the angular radius so floating-point rounding
/// never excludes a boundary row.
const MARGIN: f64 = 1.05;

/// A latitude/longitude rectangle around a center point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge latitude.
    pub lat_min: f64,
    /// Northern edge latitude.
    pub lat_max: f64,
    /// Western edge longitude.
    pub lng_min: f64,
    /// Eastern edge longitude.
    pub lng_max: f64,
}

impl BoundingBox {
    /// Computes the box around `(lat, lng)` covering every point within
    /// `radius` in `unit`.
    ///
    /// The longitude delta is widened for longitude-degree shrinkage at
    /// higher latitudes. A box that reaches a pole, crosses the
    /// antimeridian, or spans a hemisphere degrades to the full valid
    /// range on the affected axis.
    #[must_use]
    pub fn around(lat: f64, lng: f64, radius: f64, unit: Unit) -> Self {
        let angular = radius / unit.earth_radius() * MARGIN;
        let lat_rad = lat.to_radians();

        let lat_min = (lat_rad - angular).to_degrees().max(-90.0);
        let lat_max = (lat_rad + angular).to_degrees().min(90.0);

        let pole_reached = lat_rad + angular >= FRAC_PI_2 || lat_rad - angular <= -FRAC_PI_2;
        let (lng_min, lng_max) = if pole_reached {
            (-180.0, 180.0)
        } else {
            let delta = (angular.sin() / lat_rad.cos()).asin().to_degrees();
            let west = lng - delta;
            let east = lng + delta;
            if west < -180.0 || east > 180.0 {
                (-180.0, 180.0)
            } else {
                (west, east)
            }
        };

        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }

    /// Whether a point falls inside the box.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lng >= self.lng_min && lng <= self.lng_max
    }
}
