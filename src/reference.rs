use geo::algorithm::geodesic_area::GeodesicArea;
use geo::{LineString, Polygon};

use crate::geodesic::Metrics;
use crate::polygon::Ring;

/// Area and perimeter of `ring` on the WGS-84 ellipsoid, via the geo crate.
/// Clockwise rings come back with a negative signed area, which is dropped.
pub fn ellipsoid_metrics(ring: &Ring) -> Metrics {
    if ring.len() < 3 {
        return Metrics {
            area_sq_meters: 0.0,
            perimeter_meters: 0.0,
        };
    }
    let exterior: LineString<f64> = ring.closed().into_iter().map(|p| (p.lon, p.lat)).collect();
    let (perimeter, area) = Polygon::new(exterior, vec![]).geodesic_perimeter_area_signed();
    Metrics {
        area_sq_meters: area.abs(),
        perimeter_meters: perimeter,
    }
}

// signed, relative to the ellipsoid
pub fn sphere_deviation(sphere: &Metrics, ellipsoid: &Metrics) -> f64 {
    if ellipsoid.area_sq_meters == 0.0 {
        return 0.0;
    }
    (sphere.area_sq_meters - ellipsoid.area_sq_meters) / ellipsoid.area_sq_meters
}
