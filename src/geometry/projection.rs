use std::fmt;

use geo::{Coord, LineString, MapCoords, MultiLineString, MultiPolygon, Polygon};

use crate::error::ProjectionError;

/// Meters per degree of latitude (and of longitude at the equator)
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Latitudes beyond this are rejected; the local scale degenerates near the poles
pub const MAX_LATITUDE: f64 = 85.0;

/// Reference frame a layer is expressed in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees
    Geographic,
    /// Local meters around a WGS84 origin
    Projected { origin_lon: f64, origin_lat: f64 },
}

impl Crs {
    pub fn projected(origin_lon: f64, origin_lat: f64) -> Self {
        Crs::Projected {
            origin_lon,
            origin_lat,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic => write!(f, "EPSG:4326"),
            Crs::Projected {
                origin_lon,
                origin_lat,
            } => write!(f, "local meters @ ({:.6}, {:.6})", origin_lon, origin_lat),
        }
    }
}

/// Local equirectangular projection from WGS84 to meters
///
/// - x = (lon - origin_lon) * cos(origin_lat) * 111320
/// - y = (lat - origin_lat) * 111320
///
/// The mapping is affine, so straight edges stay straight in both frames and
/// the inverse is exact up to rounding. Good enough for grids a few tens of
/// kilometers across.
///
/// Longitude differences are taken the short way around, so a grid centered
/// next to the antimeridian projects continuously across it.
#[derive(Debug, Clone)]
pub struct Projector {
    origin_lon: f64,
    origin_lat: f64,
    cos_lat: f64,
}

impl Projector {
    /// Create a projector centered at `origin` (x = lon, y = lat)
    pub fn new(origin: Coord<f64>) -> Result<Self, ProjectionError> {
        check_geographic(origin.x, origin.y)?;
        Ok(Self {
            origin_lon: origin.x,
            origin_lat: origin.y,
            cos_lat: origin.y.to_radians().cos(),
        })
    }

    pub fn crs(&self) -> Crs {
        Crs::projected(self.origin_lon, self.origin_lat)
    }

    pub fn origin(&self) -> Coord<f64> {
        Coord {
            x: self.origin_lon,
            y: self.origin_lat,
        }
    }

    /// Project a lon/lat point to local meters
    pub fn to_projected(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        check_geographic(lon, lat)?;
        let x = wrap_delta(lon - self.origin_lon) * self.cos_lat * METERS_PER_DEGREE;
        let y = (lat - self.origin_lat) * METERS_PER_DEGREE;
        Ok((x, y))
    }

    /// Inverse of [`Projector::to_projected`], longitude in (-180, 180]
    pub fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }
        let lon = wrap_longitude(self.origin_lon + x / (self.cos_lat * METERS_PER_DEGREE));
        let lat = self.origin_lat + y / METERS_PER_DEGREE;
        check_geographic(lon, lat)?;
        Ok((lon, lat))
    }

    fn coord_to_projected(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let (x, y) = self.to_projected(c.x, c.y)?;
        Ok(Coord { x, y })
    }

    fn coord_to_geographic(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let (x, y) = self.to_geographic(c.x, c.y)?;
        Ok(Coord { x, y })
    }

    pub fn polygon_to_geographic(
        &self,
        polygon: &Polygon<f64>,
    ) -> Result<Polygon<f64>, ProjectionError> {
        polygon.try_map_coords(|c| self.coord_to_geographic(c))
    }

    pub fn polygon_to_projected(
        &self,
        polygon: &Polygon<f64>,
    ) -> Result<Polygon<f64>, ProjectionError> {
        polygon.try_map_coords(|c| self.coord_to_projected(c))
    }

    pub fn multi_polygon_to_projected(
        &self,
        polygons: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, ProjectionError> {
        polygons.try_map_coords(|c| self.coord_to_projected(c))
    }

    pub fn multi_polygon_to_geographic(
        &self,
        polygons: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, ProjectionError> {
        polygons.try_map_coords(|c| self.coord_to_geographic(c))
    }

    pub fn line_to_projected(
        &self,
        line: &LineString<f64>,
    ) -> Result<LineString<f64>, ProjectionError> {
        line.try_map_coords(|c| self.coord_to_projected(c))
    }

    pub fn lines_to_geographic(
        &self,
        lines: &MultiLineString<f64>,
    ) -> Result<MultiLineString<f64>, ProjectionError> {
        lines.try_map_coords(|c| self.coord_to_geographic(c))
    }
}

/// Longitude into (-180, 180]; values more than one turn out stay out of range
fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon <= -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// Longitude difference into [-180, 180)
fn wrap_delta(delta: f64) -> f64 {
    if delta >= 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

fn check_geographic(lon: f64, lat: f64) -> Result<(), ProjectionError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite { x: lon, y: lat });
    }
    if lat.abs() > MAX_LATITUDE || lon.abs() > 180.0 {
        return Err(ProjectionError::OutOfDomain { lon, lat });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Hexagon;
    use approx::assert_abs_diff_eq;
    use geo::coord;

    fn hildesheim() -> Projector {
        Projector::new(coord! { x: 9.95, y: 52.15 }).unwrap()
    }

    #[test]
    fn test_projector_origin() {
        let proj = hildesheim();
        let (x, y) = proj.to_projected(9.95, 52.15).unwrap();
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_projector_1km() {
        let proj = hildesheim();

        // 0.009 degrees of latitude is roughly 1 km
        let (_, y) = proj.to_projected(9.95, 52.15 + 0.009).unwrap();
        assert!((y - 1000.0).abs() < 50.0);
    }

    #[test]
    fn test_round_trip() {
        let proj = hildesheim();
        for &(lon, lat) in &[(9.95, 52.15), (10.2, 52.4), (9.1, 51.7), (-3.0, 60.0)] {
            let (x, y) = proj.to_projected(lon, lat).unwrap();
            let (lon2, lat2) = proj.to_geographic(x, y).unwrap();
            assert_abs_diff_eq!(lon, lon2, epsilon = 1e-7);
            assert_abs_diff_eq!(lat, lat2, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_hexagon_round_trip() {
        let proj = hildesheim();
        let hexagon = Hexagon::new(coord! { x: 1500.0, y: -2000.0 }, 1000.0).unwrap();
        let polygon = hexagon.polygon();

        let geographic = proj.polygon_to_geographic(&polygon).unwrap();
        let back = geographic
            .try_map_coords(|c| proj.coord_to_projected(c))
            .unwrap();

        for (a, b) in polygon.exterior().coords().zip(back.exterior().coords()) {
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-6);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_out_of_domain() {
        assert!(matches!(
            Projector::new(coord! { x: 0.0, y: 89.0 }),
            Err(ProjectionError::OutOfDomain { .. })
        ));

        let proj = hildesheim();
        assert!(matches!(
            proj.to_projected(f64::NAN, 52.0),
            Err(ProjectionError::NonFinite { .. })
        ));
        assert!(matches!(
            proj.to_projected(190.0, 52.0),
            Err(ProjectionError::OutOfDomain { .. })
        ));
        // 5000 km north runs past the latitude limit
        assert!(proj.to_geographic(0.0, 5_000_000.0).is_err());
    }

    #[test]
    fn test_round_trip_across_antimeridian() {
        let proj = Projector::new(coord! { x: 179.995, y: 10.0 }).unwrap();
        let hexagon = Hexagon::new(coord! { x: 0.0, y: 0.0 }, 1000.0).unwrap();

        let geographic = proj.polygon_to_geographic(&hexagon.polygon()).unwrap();
        let lons: Vec<f64> = geographic.exterior().coords().map(|c| c.x).collect();
        assert!(lons.iter().all(|lon| *lon > -180.0 && *lon <= 180.0));
        assert!(lons.iter().any(|lon| *lon < 0.0), "{:?}", lons);

        let back = geographic
            .try_map_coords(|c| proj.coord_to_projected(c))
            .unwrap();
        for (a, b) in hexagon
            .polygon()
            .exterior()
            .coords()
            .zip(back.exterior().coords())
        {
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-6);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-6);
        }

        // West of the antimeridian, seen from the eastern side
        let west = Projector::new(coord! { x: -179.995, y: 10.0 }).unwrap();
        let (x, _) = west.to_projected(179.995, 10.0).unwrap();
        assert!(x < 0.0 && x > -1200.0, "{}", x);
        let (lon, _) = west.to_geographic(-2000.0, 0.0).unwrap();
        assert!(lon > 179.9 && lon <= 180.0, "{}", lon);
    }

    #[test]
    fn test_crs_identity() {
        let a = hildesheim();
        let b = Projector::new(coord! { x: 9.95, y: 52.16 }).unwrap();
        assert_eq!(a.crs(), hildesheim().crs());
        assert_ne!(a.crs(), b.crs());
        assert_ne!(a.crs(), Crs::Geographic);
    }
}
