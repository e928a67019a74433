//! Mesh validation and repair utilities
//!
//! Checks triangle soups before they are written:
//! - Degenerate triangles (zero area)
//! - NaN/Inf coordinates
//! - Normals that disagree with the winding
//! - Open edges, i.e. edges not shared by exactly two triangles

use std::collections::HashMap;

use super::Triangle;
use super::builder::calculate_normal;

/// Result of mesh validation
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    pub total: usize,
    /// Zero or near-zero area
    pub degenerate: usize,
    /// NaN or infinite coordinates
    pub invalid_coords: usize,
    /// Normals not matching the right-hand rule
    pub invalid_normal: usize,
    /// Edges used by one triangle or more than two
    pub open_edges: usize,
}

impl ValidationReport {
    /// No coordinates a slicer would choke on
    pub fn is_valid(&self) -> bool {
        self.invalid_coords == 0
    }

    pub fn is_watertight(&self) -> bool {
        self.open_edges == 0
    }

    pub fn has_issues(&self) -> bool {
        self.degenerate > 0
            || self.invalid_coords > 0
            || self.invalid_normal > 0
            || self.open_edges > 0
    }

    pub fn summary(&self) -> String {
        if !self.has_issues() {
            format!("{} triangles, no issues", self.total)
        } else {
            format!(
                "{} triangles: {} degenerate, {} invalid coords, {} bad normals, {} open edges",
                self.total,
                self.degenerate,
                self.invalid_coords,
                self.invalid_normal,
                self.open_edges
            )
        }
    }
}

/// Minimum area for non-degenerate triangles (in square mm)
const MIN_TRIANGLE_AREA: f32 = 1e-10;

pub fn validate_mesh(triangles: &[Triangle]) -> ValidationReport {
    let mut report = ValidationReport {
        total: triangles.len(),
        open_edges: open_edges(triangles),
        ..Default::default()
    };

    for tri in triangles {
        if has_invalid_coords(tri) {
            report.invalid_coords += 1;
            continue;
        }
        if is_degenerate(tri) {
            report.degenerate += 1;
        }
        if !normal_matches(tri) {
            report.invalid_normal += 1;
        }
    }

    report
}

/// Number of edges not shared by exactly two triangles
///
/// Vertices are matched bit for bit, which is what slicers see after
/// reading a binary STL.
pub fn open_edges(triangles: &[Triangle]) -> usize {
    type Key = [u32; 3];
    let key = |v: &[f32; 3]| -> Key { [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()] };

    let mut edges: HashMap<(Key, Key), u32> = HashMap::new();
    for tri in triangles {
        for i in 0..3 {
            let a = key(&tri.vertices[i]);
            let b = key(&tri.vertices[(i + 1) % 3]);
            let edge = if a <= b { (a, b) } else { (b, a) };
            *edges.entry(edge).or_default() += 1;
        }
    }

    edges.values().filter(|&&count| count != 2).count()
}

fn has_invalid_coords(tri: &Triangle) -> bool {
    tri.vertices.iter().flatten().any(|c| !c.is_finite())
        || tri.normal.iter().any(|c| !c.is_finite())
}

fn is_degenerate(tri: &Triangle) -> bool {
    triangle_area(&tri.vertices) < MIN_TRIANGLE_AREA
}

fn triangle_area(vertices: &[[f32; 3]; 3]) -> f32 {
    let [v0, v1, v2] = *vertices;
    let a = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let b = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

    let cx = a[1] * b[2] - a[2] * b[1];
    let cy = a[2] * b[0] - a[0] * b[2];
    let cz = a[0] * b[1] - a[1] * b[0];

    0.5 * (cx * cx + cy * cy + cz * cz).sqrt()
}

fn normal_matches(tri: &Triangle) -> bool {
    let expected = calculate_normal(&tri.vertices);
    let dot: f32 = expected.iter().zip(&tri.normal).map(|(a, b)| a * b).sum();
    dot > 0.99
}

/// Recalculate normals from the winding (right-hand rule)
pub fn fix_normals(triangles: &mut [Triangle]) {
    for tri in triangles.iter_mut() {
        tri.normal = calculate_normal(&tri.vertices);
    }
}

/// Drop degenerate triangles and triangles with invalid coordinates
pub fn remove_degenerate(triangles: Vec<Triangle>) -> Vec<Triangle> {
    triangles
        .into_iter()
        .filter(|tri| !has_invalid_coords(tri) && !is_degenerate(tri))
        .collect()
}

/// Validate, fix normals and drop unusable triangles in one pass
///
/// The report describes the mesh as it was passed in.
pub fn validate_and_fix(mut triangles: Vec<Triangle>) -> (Vec<Triangle>, ValidationReport) {
    let report = validate_mesh(&triangles);
    fix_normals(&mut triangles);
    (remove_degenerate(triangles), report)
}
