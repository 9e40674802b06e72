//! Great-circle distance between coordinate pairs.

use strum_macros::{AsRefStr, Display, EnumString};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MI: f64 = 3958.7613;

/// Unit for distance values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Unit {
    /// Statute miles.
    #[default]
    Miles,
    /// Kilometers.
    Kilometers,
}

impl Unit {
    /// Mean Earth radius in this unit.
    #[must_use]
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Miles => EARTH_RADIUS_MI,
            Self::Kilometers => EARTH_RADIUS_KM,
        }
    }

    /// Degrees of latitude spanned by one unit of surface distance.
    #[must_use]
    pub fn degrees_per_unit(self) -> f64 {
        360.0 / (2.0 * std::f64::consts::PI * self.earth_radius())
    }
}

/// Great-circle distance between two points via the haversine formula.
///
/// Coordinates are in degrees; the result is in `unit`. Symmetric in its
/// two endpoints and zero for identical points.
#[must_use]
pub fn haversine(lat1: f64, lng1: f64, lat2: f64, lng2: f64, unit: Unit) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // Clamp against rounding drift pushing sqrt(a) past 1 for antipodes.
    2.0 * unit.earth_radius() * a.sqrt().min(1.0).asin()
}
