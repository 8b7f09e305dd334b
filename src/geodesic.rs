use crate::error::{Error, Result};
use crate::point::WGS84Point;
use crate::polygon::Ring;

/// WGS-84 equatorial radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

pub const SQ_METERS_PER_HECTARE: f64 = 10_000.0;

/// Square meters per international acre, as rounded by the polygon API.
pub const SQ_METERS_PER_ACRE: f64 = 4046.86;

/// Area and perimeter of a ring. Both values are unrounded and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub area_sq_meters: f64,
    pub perimeter_meters: f64,
}

impl Metrics {
    pub fn area_hectares(&self) -> f64 {
        self.area_sq_meters / SQ_METERS_PER_HECTARE
    }

    pub fn area_acres(&self) -> f64 {
        self.area_sq_meters / SQ_METERS_PER_ACRE
    }
}

/// Validates `ring` and computes its area and perimeter.
///
/// # Errors
/// `InvalidGeometry` when the ring has fewer than 3 vertices, a vertex is out
/// of range (or NaN), or two consecutive vertices are identical, including the
/// implicit last -> first edge.
///
/// # Example
/// ```
/// use polygon_mapper::geodesic::compute_metrics;
/// use polygon_mapper::polygon::Ring;
///
/// let ring = Ring::from(vec![[-74.01, 40.70], [-74.00, 40.70], [-74.00, 40.71], [-74.01, 40.71]]);
/// let metrics = compute_metrics(&ring).unwrap();
/// assert!(metrics.area_sq_meters > 900_000.0 && metrics.area_sq_meters < 1_000_000.0);
/// ```
pub fn compute_metrics(ring: &Ring) -> Result<Metrics> {
    validate(ring)?;
    let metrics = Metrics {
        area_sq_meters: ring_area(ring),
        perimeter_meters: ring_perimeter(ring),
    };
    log::debug!(
        "metrics: {} vertices, area {:.1} m2, perimeter {:.1} m",
        ring.len(),
        metrics.area_sq_meters,
        metrics.perimeter_meters
    );
    Ok(metrics)
}

pub fn validate(ring: &Ring) -> Result<()> {
    if ring.len() < 3 {
        return Err(Error::InvalidGeometry(format!(
            "ring needs at least 3 vertices, got {}",
            ring.len()
        )));
    }
    if let Some((i, p)) = ring.points().iter().enumerate().find(|(_, p)| !p.in_range()) {
        return Err(Error::InvalidGeometry(format!(
            "vertex {} out of range: [{}, {}]",
            i, p.lon, p.lat
        )));
    }
    if let Some((i, (a, _))) = ring.edges().enumerate().find(|(_, (a, b))| a.same_position(b)) {
        return Err(Error::InvalidGeometry(format!(
            "degenerate edge {} -> {} at [{}, {}]",
            i,
            (i + 1) % ring.len(),
            a.lon,
            a.lat
        )));
    }
    Ok(())
}

// unsigned, does not validate
pub fn ring_area(ring: &Ring) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let sum: f64 = ring
        .edges()
        .map(|(p1, p2)| {
            let d_lon = normalize_lon_delta(p2.lon - p1.lon).to_radians();
            let lat1 = p1.lat.to_radians();
            let lat2 = p2.lat.to_radians();
            d_lon * (2.0 + lat1.sin() + lat2.sin())
        })
        .sum();
    sum.abs() * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0
}

pub fn ring_perimeter(ring: &Ring) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    ring.edges().map(|(p1, p2)| haversine_distance(p1, p2)).sum()
}

#[inline]
pub fn haversine_distance(from: &WGS84Point, to: &WGS84Point) -> f64 {
    let (lon1, lat1) = from.to_radians();
    let (lon2, lat2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // rounding can push `a` a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_M * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Maps a longitude difference in degrees into (-180, 180].
#[inline]
pub fn normalize_lon_delta(delta: f64) -> f64 {
    let mut d = delta % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rectangle(west: f64, south: f64, east: f64, north: f64) -> Ring {
        Ring::from(vec![[west, south], [east, south], [east, north], [west, north]])
    }

    // exact spherical area of a lat/lon rectangle
    fn rectangle_area(d_lon: f64, south: f64, north: f64) -> f64 {
        EARTH_RADIUS_M
            * EARTH_RADIUS_M
            * d_lon.to_radians()
            * (north.to_radians().sin() - south.to_radians().sin())
    }

    fn assert_close(actual: f64, expected: f64, rel: f64) {
        let err = ((actual - expected) / expected).abs();
        assert!(err < rel, "actual {} expected {} (rel err {})", actual, expected, err);
    }

    #[test]
    fn test_one_km_square_near_new_york() {
        let side = 1000.0;
        let south = 40.7;
        let d_lat = (side / EARTH_RADIUS_M).to_degrees();
        let d_lon = (side / (EARTH_RADIUS_M * (south + d_lat / 2.0).to_radians().cos())).to_degrees();
        let ring = rectangle(-74.0, south, -74.0 + d_lon, south + d_lat);

        let m = compute_metrics(&ring).unwrap();
        assert_close(m.area_sq_meters, 1_000_000.0, 1e-3);
        assert_close(m.perimeter_meters, 4_000.0, 1e-3);
    }

    #[test]
    fn test_rectangle_matches_closed_form_area() {
        let ring = rectangle(10.0, 45.0, 10.05, 45.03);
        let m = compute_metrics(&ring).unwrap();
        assert_close(m.area_sq_meters, rectangle_area(0.05, 45.0, 45.03), 1e-9);
    }

    #[test]
    fn test_meridian_edge_is_arc_length() {
        let a = WGS84Point::new(5.0, 10.0);
        let b = WGS84Point::new(5.0, 11.0);
        assert_close(haversine_distance(&a, &b), EARTH_RADIUS_M * 1f64.to_radians(), 1e-10);
    }

    #[test]
    fn test_haversine_antipodal_is_half_circumference() {
        let a = WGS84Point::new(0.0, 0.0);
        let b = WGS84Point::new(180.0, 0.0);
        let d = haversine_distance(&a, &b);
        assert!(!d.is_nan());
        assert_close(d, std::f64::consts::PI * EARTH_RADIUS_M, 1e-12);
    }

    #[test]
    fn test_winding_does_not_change_area() {
        let ring = rectangle(2.0, 48.8, 2.02, 48.81);
        let mut reversed = ring.clone();
        reversed.wgs.reverse();
        let a = compute_metrics(&ring).unwrap();
        let b = compute_metrics(&reversed).unwrap();
        assert_close(b.area_sq_meters, a.area_sq_meters, 1e-9);
        assert_close(b.perimeter_meters, a.perimeter_meters, 1e-9);
    }

    #[test]
    fn test_antimeridian_crossing_matches_shifted_ring() {
        let seam = Ring::from(vec![
            [179.99, 10.0],
            [-179.99, 10.0],
            [-179.99, 10.01],
            [179.99, 10.01],
        ]);
        let shifted = rectangle(-0.01, 10.0, 0.01, 10.01);
        let a = compute_metrics(&seam).unwrap();
        let b = compute_metrics(&shifted).unwrap();
        assert_close(a.area_sq_meters, b.area_sq_meters, 1e-6);
        assert_close(a.perimeter_meters, b.perimeter_meters, 1e-6);
        assert_close(a.area_sq_meters, rectangle_area(0.02, 10.0, 10.01), 1e-6);
    }

    #[test]
    fn test_collinear_ring_has_zero_area() {
        let ring = Ring::from(vec![[0.0, 0.0], [0.001, 0.0], [0.002, 0.0]]);
        let m = compute_metrics(&ring).unwrap();
        assert!(m.area_sq_meters.abs() < 1e-3);
        assert!(m.perimeter_meters > 0.0);
    }

    #[test]
    fn test_too_few_vertices() {
        let ring = Ring::from(vec![[0.0, 0.0], [1.0, 0.0]]);
        assert!(matches!(compute_metrics(&ring), Err(Error::InvalidGeometry(_))));
        assert!(matches!(compute_metrics(&Ring::default()), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_duplicated_consecutive_vertex() {
        let ring = Ring::from(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        assert!(matches!(compute_metrics(&ring), Err(Error::InvalidGeometry(_))));

        let seam = Ring::from(vec![[180.0, 0.0], [-180.0, 0.0], [0.0, 10.0]]);
        assert!(matches!(compute_metrics(&seam), Err(Error::InvalidGeometry(_))));

        let pole = Ring::from(vec![[0.0, 90.0], [90.0, 90.0], [45.0, 89.0]]);
        assert!(matches!(compute_metrics(&pole), Err(Error::InvalidGeometry(_))));

        let south = Ring::from(vec![[10.0, -89.0], [20.0, -89.0], [15.0, -90.0], [-30.0, -90.0]]);
        assert!(matches!(compute_metrics(&south), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_single_pole_vertex_is_valid() {
        let ring = Ring::from(vec![[0.0, 89.0], [90.0, 89.0], [45.0, 90.0]]);
        let m = compute_metrics(&ring).unwrap();
        assert!(m.area_sq_meters > 0.0);
    }

    #[test]
    fn test_explicitly_closed_ring_is_degenerate() {
        let ring = Ring::from(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        assert!(matches!(compute_metrics(&ring), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_out_of_range_and_nan_vertices() {
        let ring = Ring::from(vec![[0.0, 0.0], [181.0, 0.0], [1.0, 1.0]]);
        assert!(matches!(compute_metrics(&ring), Err(Error::InvalidGeometry(_))));
        let ring = Ring::from(vec![[0.0, 0.0], [1.0, f64::NAN], [1.0, 1.0]]);
        assert!(matches!(compute_metrics(&ring), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_normalize_lon_delta() {
        assert_eq!(normalize_lon_delta(0.0), 0.0);
        assert_eq!(normalize_lon_delta(180.0), 180.0);
        assert_eq!(normalize_lon_delta(-180.0), 180.0);
        assert!((normalize_lon_delta(-359.98) - 0.02).abs() < 1e-9);
        assert!((normalize_lon_delta(359.98) + 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_unit_conversions() {
        let m = Metrics {
            area_sq_meters: 40_468.6,
            perimeter_meters: 0.0,
        };
        assert!((m.area_hectares() - 4.04686).abs() < 1e-9);
        assert!((m.area_acres() - 10.0).abs() < 1e-9);
    }
}
