//! Layered extrusion of one hexagonal tile.
//!
//! Every tile is normalized from its own hexagon bounding box onto the same
//! physical footprint, and every band height is measured from one job-wide
//! elevation offset. Tiles printed from one job therefore share horizontal
//! and vertical scale and can be placed side by side.

use std::cmp::Ordering;

use geo::MultiLineString;

use super::extrusion::extrude_normalized;
use super::validation::validate_and_fix;
use super::{Mesh, Rgb, Triangle, Volume, extrude_ribbon};
use crate::domain::{ElevationBand, RoadSegment};
use crate::error::CrsMismatchError;
use crate::geometry::{Bounds, Crs, Hexagon, NormalizationParams, simplify};

pub const BASE_COLOR: Rgb = Rgb(96, 96, 96);
pub const ROAD_COLOR: Rgb = Rgb(40, 40, 40);

/// Low to high: lowland green, grass, tan, brown, snow
const HYPSOMETRIC_STOPS: [(f64, Rgb); 5] = [
    (0.0, Rgb(46, 125, 50)),
    (0.35, Rgb(158, 194, 74)),
    (0.6, Rgb(230, 200, 110)),
    (0.85, Rgb(156, 107, 58)),
    (1.0, Rgb(245, 245, 245)),
];

/// Job-wide scale parameters shared by every tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrusionParams {
    /// Frame the hexagons and bands live in
    pub frame: Crs,
    /// Larger side of each tile's bounding box, in mm
    pub target_footprint_mm: f64,
    pub base_height_mm: f64,
    pub elevation_scale_mm_per_m: f64,
    /// Elevation drawn at the top of the base slab, usually the job minimum
    pub elevation_offset_m: f64,
    /// Elevation span covered by the color palette
    pub color_span_m: f64,
}

impl ExtrusionParams {
    /// Height of a band above the base slab, in mm
    pub fn band_height_mm(&self, elevation: f64) -> f64 {
        (elevation - self.elevation_offset_m) * self.elevation_scale_mm_per_m
    }
}

/// Road ribbon dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadParams {
    /// Real-world width of one lane; roads without a lane count use one lane
    pub lane_width_m: f64,
    /// Narrowest printable ribbon
    pub min_width_mm: f64,
    /// How far ribbons stand above the surface they lie on
    pub height_mm: f64,
    /// Douglas-Peucker level 0 (off) to 3
    pub simplify: u8,
}

impl Default for RoadParams {
    fn default() -> Self {
        Self {
            lane_width_m: 3.5,
            min_width_mm: 0.6,
            height_mm: 0.4,
            simplify: 0,
        }
    }
}

/// Projected meters → tile millimeters for `hexagon`
pub fn normalization(hexagon: &Hexagon, target_footprint_mm: f64) -> NormalizationParams {
    NormalizationParams::from_bounds(&Bounds::from(hexagon.bounding_rect()), target_footprint_mm)
}

/// Base slab plus one solid per band standing on it
///
/// Bands at exactly the offset add nothing and are skipped; bands below it
/// are skipped with a warning. Volumes come out in ascending elevation.
pub fn extrude(
    hexagon: &Hexagon,
    bands: &[ElevationBand],
    params: &ExtrusionParams,
) -> Result<Mesh, CrsMismatchError> {
    for band in bands {
        CrsMismatchError::check("elevation band", params.frame, band.crs)?;
    }

    let norm = normalization(hexagon, params.target_footprint_mm);
    let base_top = params.base_height_mm as f32;

    let base = extrude_normalized(&hexagon.polygon(), &norm, 0.0, base_top);
    let mut volumes = vec![finish_volume("base", BASE_COLOR, base)];

    let mut ordered: Vec<&ElevationBand> = bands.iter().collect();
    ordered.sort_by(|a, b| {
        a.elevation
            .partial_cmp(&b.elevation)
            .unwrap_or(Ordering::Equal)
    });

    for band in ordered {
        let height = params.band_height_mm(band.elevation);
        if height == 0.0 {
            log::debug!("{} m band is at the offset, skipping", band.elevation);
            continue;
        }
        if !(height > 0.0) {
            log::warn!(
                "{} m band lies below the {} m offset, skipping",
                band.elevation,
                params.elevation_offset_m
            );
            continue;
        }

        let top = (params.base_height_mm + height) as f32;
        let triangles: Vec<Triangle> = band
            .polygon
            .iter()
            .flat_map(|polygon| extrude_normalized(polygon, &norm, base_top, top))
            .collect();
        if triangles.is_empty() {
            log::debug!("{} m band produced no triangles", band.elevation);
            continue;
        }

        let color = hypsometric_color(
            band.elevation - params.elevation_offset_m,
            params.color_span_m,
        );
        volumes.push(finish_volume(
            &format!("band_{}m", band.elevation),
            color,
            triangles,
        ));
    }

    Ok(Mesh { volumes })
}

/// Road ribbons standing on the band each segment lies in
///
/// Width scales with the lane count. `None` when no segment yields a ribbon.
pub fn extrude_roads(
    hexagon: &Hexagon,
    segments: &[RoadSegment],
    params: &ExtrusionParams,
    roads: &RoadParams,
) -> Result<Option<Volume>, CrsMismatchError> {
    for segment in segments {
        CrsMismatchError::check("road segment", params.frame, segment.crs)?;
    }

    let norm = normalization(hexagon, params.target_footprint_mm);
    let epsilon = simplify::road_epsilon(hexagon.size(), roads.simplify);

    let mut triangles = Vec::new();
    for segment in segments {
        let lines: MultiLineString<f64> = simplify::simplify_lines(&segment.geometry, epsilon);
        let lanes = segment.lanes.max(1) as f64;
        let width = (lanes * roads.lane_width_m * norm.scale).max(roads.min_width_mm);
        let surface = segment
            .elevation
            .map(|e| params.band_height_mm(e).max(0.0))
            .unwrap_or(0.0);

        let z_bottom = params.base_height_mm as f32;
        let z_top = (params.base_height_mm + surface + roads.height_mm) as f32;
        for line in &lines {
            let points = norm.apply_coords(line.coords());
            triangles.extend(extrude_ribbon(&points, width as f32, z_bottom, z_top));
        }
    }

    if triangles.is_empty() {
        return Ok(None);
    }
    Ok(Some(finish_volume("roads", ROAD_COLOR, triangles)))
}

/// Palette color for an elevation `relative_m` above the offset
pub fn hypsometric_color(relative_m: f64, span_m: f64) -> Rgb {
    let t = if span_m > 0.0 {
        (relative_m / span_m).clamp(0.0, 1.0)
    } else {
        0.0
    };

    for pair in HYPSOMETRIC_STOPS.windows(2) {
        let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
        if t <= t1 {
            return c0.lerp(c1, (t - t0) / (t1 - t0));
        }
    }
    HYPSOMETRIC_STOPS[HYPSOMETRIC_STOPS.len() - 1].1
}

fn finish_volume(name: &str, color: Rgb, triangles: Vec<Triangle>) -> Volume {
    let (triangles, report) = validate_and_fix(triangles);
    if report.degenerate > 0 || !report.is_valid() {
        log::warn!("{}: {}", name, report.summary());
    } else if !report.is_watertight() {
        // Ribbons meeting end to end share their caps
        log::debug!("{}: {}", name, report.summary());
    }
    Volume::new(name, color, triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::validation::open_edges;
    use approx::assert_abs_diff_eq;
    use geo::{MultiPolygon, coord, line_string, polygon};

    fn frame() -> Crs {
        Crs::projected(9.95, 52.15)
    }

    fn params(offset: f64) -> ExtrusionParams {
        ExtrusionParams {
            frame: frame(),
            target_footprint_mm: 100.0,
            base_height_mm: 10.0,
            elevation_scale_mm_per_m: 0.1 / 5.0,
            elevation_offset_m: offset,
            color_span_m: 50.0,
        }
    }

    fn hexagon() -> Hexagon {
        Hexagon::new(coord! { x: 0.0, y: 0.0 }, 650.0).unwrap()
    }

    fn square_band(half: f64, elevation: f64) -> ElevationBand {
        ElevationBand::new(
            MultiPolygon::new(vec![polygon![
                (x: -half, y: -half),
                (x: half, y: -half),
                (x: half, y: half),
                (x: -half, y: half),
            ]]),
            elevation,
            frame(),
        )
    }

    fn extent(triangles: &[Triangle], axis: usize) -> (f32, f32) {
        triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(move |v| v[axis]))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }

    #[test]
    fn test_two_bands_at_offset_and_above() {
        let bands = vec![square_band(300.0, 100.0), square_band(200.0, 105.0)];

        let mesh = extrude(&hexagon(), &bands, &params(100.0)).unwrap();

        assert_eq!(mesh.volumes.len(), 2);
        assert_eq!(mesh.volumes[0].name, "base");
        assert_eq!(mesh.volumes[1].name, "band_105m");

        let (bottom, top) = mesh.volumes[1].z_range().unwrap();
        assert_abs_diff_eq!(bottom, 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(top, 10.1, epsilon = 1e-5);
        assert_eq!(mesh.volumes[0].z_range(), Some((0.0, 10.0)));
    }

    #[test]
    fn test_footprint_matches_target() {
        let mesh = extrude(&hexagon(), &[], &params(0.0)).unwrap();
        let base = &mesh.volumes[0].triangles;

        let (min_x, max_x) = extent(base, 0);
        let (min_y, max_y) = extent(base, 1);
        assert_abs_diff_eq!(min_x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(min_y, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!((max_x - min_x).max(max_y - min_y), 100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_bands_share_hexagon_normalization() {
        // The band covers the right half of the hexagon's bounding box
        let band = ElevationBand::new(
            MultiPolygon::new(vec![polygon![
                (x: 0.0, y: -650.0),
                (x: 650.0, y: 0.0),
                (x: 0.0, y: 650.0),
            ]]),
            120.0,
            frame(),
        );

        let mesh = extrude(&hexagon(), &[band], &params(100.0)).unwrap();
        let (min_x, max_x) = extent(&mesh.volumes[1].triangles, 0);

        assert_abs_diff_eq!(min_x, 50.0, epsilon = 1e-4);
        assert_abs_diff_eq!(max_x, 100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_solids_are_watertight_with_upward_tops() {
        let bands = vec![square_band(400.0, 110.0), square_band(100.0, 140.0)];
        let mesh = extrude(&hexagon(), &bands, &params(100.0)).unwrap();

        assert_eq!(mesh.volumes.len(), 3);
        for volume in &mesh.volumes {
            assert_eq!(open_edges(&volume.triangles), 0, "{}", volume.name);

            let (_, top) = volume.z_range().unwrap();
            let tops: Vec<&Triangle> = volume
                .triangles
                .iter()
                .filter(|t| t.min_z() == top)
                .collect();
            assert!(!tops.is_empty());
            assert!(tops.iter().all(|t| t.normal[2] > 0.99), "{}", volume.name);
        }
    }

    #[test]
    fn test_band_below_offset_skipped() {
        let bands = vec![square_band(300.0, 90.0), square_band(200.0, 110.0)];
        let mesh = extrude(&hexagon(), &bands, &params(100.0)).unwrap();

        let names: Vec<&str> = mesh.volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["base", "band_110m"]);
    }

    #[test]
    fn test_foreign_band_crs_rejected() {
        let mut band = square_band(300.0, 110.0);
        band.crs = Crs::Geographic;

        let err = extrude(&hexagon(), &[band], &params(100.0)).unwrap_err();
        assert_eq!(err.found, Crs::Geographic);
    }

    #[test]
    fn test_road_ribbons() {
        let segment = RoadSegment::new(
            MultiLineString::new(vec![line_string![(x: -300.0, y: 0.0), (x: 300.0, y: 0.0)]]),
            3,
            frame(),
        )
        .with_elevation(
            MultiLineString::new(vec![line_string![(x: -300.0, y: 0.0), (x: 300.0, y: 0.0)]]),
            150.0,
        );
        let params = params(100.0);

        let volume = extrude_roads(&hexagon(), &[segment], &params, &RoadParams::default())
            .unwrap()
            .unwrap();

        assert_eq!(volume.name, "roads");
        assert_eq!(open_edges(&volume.triangles), 0);
        let (bottom, top) = volume.z_range().unwrap();
        assert_abs_diff_eq!(bottom, 10.0, epsilon = 1e-5);
        // 50 m above the offset is 1 mm, plus the ribbon height
        assert_abs_diff_eq!(top, 11.4, epsilon = 1e-5);

        // Three 3.5 m lanes at 100 mm / 1300 m
        let (min_y, max_y) = extent(&volume.triangles, 1);
        assert_abs_diff_eq!(max_y - min_y, (10.5 * 100.0 / 1300.0) as f32, epsilon = 1e-4);
    }

    #[test]
    fn test_no_roads_no_volume() {
        let volume = extrude_roads(&hexagon(), &[], &params(0.0), &RoadParams::default()).unwrap();
        assert!(volume.is_none());
    }

    #[test]
    fn test_hypsometric_palette() {
        assert_eq!(hypsometric_color(0.0, 100.0), HYPSOMETRIC_STOPS[0].1);
        assert_eq!(hypsometric_color(-5.0, 100.0), HYPSOMETRIC_STOPS[0].1);
        assert_eq!(hypsometric_color(100.0, 100.0), Rgb(245, 245, 245));
        assert_eq!(hypsometric_color(500.0, 100.0), Rgb(245, 245, 245));
        assert_eq!(hypsometric_color(60.0, 100.0), Rgb(230, 200, 110));
        assert_eq!(hypsometric_color(10.0, 0.0), HYPSOMETRIC_STOPS[0].1);
    }
}
