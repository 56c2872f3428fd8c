//! Hexagonal areas of interest
//!
//! A hexagon is built around a center point by placing six vertices at
//! 60°-spaced angles on a circle whose radius is given in meters. The radius
//! is converted to an angle with a spherical Earth and the vertices are
//! offset in (longitude, latitude) radians as if the coordinates were planar.
//!
//! # Approximation Error
//!
//! The offset is equirectangular: one radian of longitude is treated like one
//! radian of latitude. On the ground a degree of longitude only spans
//! `cos(latitude)` of a degree of latitude, so the east-west extent of the
//! hexagon is `cos(latitude)` times narrower than requested, and the requested
//! radius overstates the real half-width by `1 / cos(latitude) - 1`
//! ([`east_west_distortion`]): about 0.2% at 4°, 15% at 30° and 48% at 47.6°
//! (Seattle). The north-south extent is unaffected. The curvature term neglected by the
//! flat offset is of order `(radius / earth_radius)²` and irrelevant for radii
//! of a few hundred meters.

use geo::{Coord, LineString, Point, Polygon};

/// Mean Earth radius used to convert meters into angles.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default hexagon radius: 0.001° of latitude (1° ≈ 111,111 m).
pub const DEFAULT_RADIUS_METERS: f64 = 111_111.0 * 0.001;

const SIDES: u32 = 6;

/// A hexagonal area of interest around a center point.
#[derive(Debug, Clone, PartialEq)]
pub struct Hexagon {
    center: Point<f64>,
    radius_meters: f64,
    polygon: Polygon<f64>,
}

impl Hexagon {
    /// Returns the point the hexagon was built around.
    #[must_use]
    pub fn center(&self) -> Point<f64> {
        self.center
    }

    #[must_use]
    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Returns the hexagon outline in degrees.
    #[must_use]
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    #[must_use]
    pub fn into_polygon(self) -> Polygon<f64> {
        self.polygon
    }
}

/// Creates a hexagon centered at `center` (longitude, latitude in degrees).
///
/// The returned polygon has six distinct vertices plus the closing vertex.
/// Inputs must be finite; no validation is performed.
///
/// # Examples
///
/// ```
/// use geo::{Centroid, Point};
/// use heatisle_spatial::hexagon::{DEFAULT_RADIUS_METERS, create_hexagon};
///
/// let hexagon = create_hexagon(Point::new(-122.34543, 47.65792), DEFAULT_RADIUS_METERS);
/// assert_eq!(hexagon.polygon().exterior().0.len(), 7);
///
/// let centroid = hexagon.polygon().centroid().unwrap();
/// assert!((centroid.x() - -122.34543).abs() < 1e-9);
/// assert!((centroid.y() - 47.65792).abs() < 1e-9);
/// ```
#[must_use]
pub fn create_hexagon(center: Point<f64>, radius_meters: f64) -> Hexagon {
    let angular_radius = radius_meters / EARTH_RADIUS_METERS;
    let lon_rad = center.x().to_radians();
    let lat_rad = center.y().to_radians();

    let vertices = (0..SIDES)
        .map(|i| {
            let angle = std::f64::consts::FRAC_PI_3 * f64::from(i);
            Coord {
                x: (lon_rad + angular_radius * angle.cos()).to_degrees(),
                y: (lat_rad + angular_radius * angle.sin()).to_degrees(),
            }
        })
        .collect::<Vec<_>>();

    // Polygon::new closes the ring by repeating the first vertex
    let polygon = Polygon::new(LineString::new(vertices), vec![]);
    Hexagon {
        center,
        radius_meters,
        polygon,
    }
}

/// Relative east-west shortfall of a hexagon built at `latitude_deg`.
///
/// Returns `1 / cos(latitude) - 1`: the factor by which the requested radius
/// exceeds the real east-west half-width of the hexagon. Zero at the equator,
/// unbounded towards the poles.
///
/// # Examples
///
/// ```
/// use heatisle_spatial::hexagon::east_west_distortion;
///
/// assert_eq!(east_west_distortion(0.0), 0.0);
/// assert!((east_west_distortion(60.0) - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn east_west_distortion(latitude_deg: f64) -> f64 {
    1.0 / latitude_deg.to_radians().cos() - 1.0
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{Area, Centroid};

    use super::*;

    #[test]
    fn test_ring_is_closed_with_six_distinct_vertices() {
        for (lon, lat, radius) in [
            (0.0, 0.0, 1.0),
            (-122.333, 47.606, DEFAULT_RADIUS_METERS),
            (151.2, -33.9, 500.0),
            (179.9, 80.0, 2_000.0),
        ] {
            let hexagon = create_hexagon(Point::new(lon, lat), radius);
            let coords = &hexagon.polygon().exterior().0;
            assert_eq!(coords.len(), 7);
            assert_eq!(coords[0], coords[6]);
            for i in 0..6 {
                for j in (i + 1)..6 {
                    assert_ne!(coords[i], coords[j]);
                }
            }
        }
    }

    #[test]
    fn test_centroid_matches_center() {
        for (lon, lat) in [(0.0, 0.0), (-122.34543, 47.65792), (10.5, -60.25)] {
            let hexagon = create_hexagon(Point::new(lon, lat), 250.0);
            let centroid = hexagon.polygon().centroid().unwrap();
            assert_abs_diff_eq!(centroid.x(), lon, epsilon = 1e-9);
            assert_abs_diff_eq!(centroid.y(), lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_default_radius_is_a_thousandth_of_a_degree() {
        let hexagon = create_hexagon(Point::new(0.0, 0.0), DEFAULT_RADIUS_METERS);
        let first = hexagon.polygon().exterior().0[0];
        let expected = (DEFAULT_RADIUS_METERS / EARTH_RADIUS_METERS).to_degrees();
        assert_abs_diff_eq!(first.x, expected, epsilon = 1e-15);
        assert_abs_diff_eq!(first.y, 0.0);
        // roughly 0.001 degree
        assert!((first.x - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_area_of_regular_hexagon() {
        let hexagon = create_hexagon(Point::new(3.0, 4.0), 1_000.0);
        let r = (1_000.0 / EARTH_RADIUS_METERS).to_degrees();
        let expected = 3.0 * 3.0_f64.sqrt() / 2.0 * r * r;
        assert_abs_diff_eq!(hexagon.polygon().unsigned_area(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_radius_collapses() {
        let hexagon = create_hexagon(Point::new(1.0, 2.0), 0.0);
        assert_eq!(hexagon.polygon().unsigned_area(), 0.0);
    }
}
