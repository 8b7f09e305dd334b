use core::fmt;

use serde::{Deserialize, Serialize};

// serialized as [lng, lat], GeoJSON order
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct WGS84Point {
    pub lon: f64,
    pub lat: f64,
}

impl WGS84Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// False for NaN as well as for values outside [-180, 180] x [-90, 90].
    pub fn in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }

    pub fn approx_eq(&self, other: &WGS84Point, tolerance: f64) -> bool {
        (self.lon - other.lon).abs() <= tolerance && (self.lat - other.lat).abs() <= tolerance
    }

    /// Same place on the globe: longitudes 180 and -180 coincide, and every
    /// longitude names the same point at either pole.
    pub fn same_position(&self, other: &WGS84Point) -> bool {
        if self.lat != other.lat {
            return false;
        }
        self.lat.abs() == 90.0
            || self.lon == other.lon
            || (self.lon.abs() == 180.0 && other.lon.abs() == 180.0)
    }

    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.lon.to_radians(), self.lat.to_radians())
    }
}

impl From<[f64; 2]> for WGS84Point {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<WGS84Point> for [f64; 2] {
    fn from(p: WGS84Point) -> Self {
        [p.lon, p.lat]
    }
}

impl fmt::Display for WGS84Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wgs(lat: {:.5}, lon: {:.5})", self.lat, self.lon)
    }
}
