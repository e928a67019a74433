use geo::Polygon;

use super::triangulation::{triangulate_polygon, turn};
use super::{MeshBuilder, Triangle};
use crate::geometry::NormalizationParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winding {
    CounterClockwise,
    Clockwise,
}

/// Extrude a polygon with holes into a closed prism between two heights
///
/// Rings may be open or closed and of either orientation. The top faces
/// point up, the bottom faces down and every wall outward, so the result is
/// watertight as long as the rings are simple.
pub fn extrude_polygon(
    outer: &[(f32, f32)],
    holes: &[Vec<(f32, f32)>],
    z_bottom: f32,
    z_top: f32,
) -> Vec<Triangle> {
    if !(z_top > z_bottom) {
        return Vec::new();
    }
    let Some(outer) = prepare_ring(outer, Winding::CounterClockwise) else {
        return Vec::new();
    };
    let holes: Vec<Vec<(f32, f32)>> = holes
        .iter()
        .filter_map(|hole| prepare_ring(hole, Winding::Clockwise))
        .collect();

    let triangles = triangulate_polygon(&outer, &holes);
    if triangles.is_empty() {
        return Vec::new();
    }

    let points: Vec<(f32, f32)> = outer
        .iter()
        .chain(holes.iter().flatten())
        .copied()
        .collect();

    let mut builder = MeshBuilder::new();
    for [a, b, c] in triangles {
        let (p0, p1, p2) = (points[a], points[b], points[c]);
        // Ear clipping output is not consistently wound
        let (p1, p2) = if turn(p0, p1, p2) > 0.0 {
            (p2, p1)
        } else {
            (p1, p2)
        };

        builder.add_triangle(
            [p0.0, p0.1, z_top],
            [p1.0, p1.1, z_top],
            [p2.0, p2.1, z_top],
        );
        builder.add_triangle(
            [p0.0, p0.1, z_bottom],
            [p2.0, p2.1, z_bottom],
            [p1.0, p1.1, z_bottom],
        );
    }

    // Outer ring CCW and holes CW both keep the solid on their left
    for ring in std::iter::once(&outer).chain(holes.iter()) {
        for (i, &from) in ring.iter().enumerate() {
            let to = ring[(i + 1) % ring.len()];
            builder.add_wall(from, to, z_bottom, z_top);
        }
    }

    builder.finish()
}

/// Normalize a projected polygon to mm and extrude it
pub fn extrude_normalized(
    polygon: &Polygon<f64>,
    params: &NormalizationParams,
    z_bottom: f32,
    z_top: f32,
) -> Vec<Triangle> {
    let outer = params.apply_coords(polygon.exterior().coords());
    let holes: Vec<Vec<(f32, f32)>> = polygon
        .interiors()
        .iter()
        .map(|ring| params.apply_coords(ring.coords()))
        .collect();
    extrude_polygon(&outer, &holes, z_bottom, z_top)
}

/// Open ring without repeated or collinear vertices, in the requested winding
///
/// `None` when fewer than three corners remain.
fn prepare_ring(ring: &[(f32, f32)], winding: Winding) -> Option<Vec<(f32, f32)>> {
    let mut points: Vec<(f32, f32)> = Vec::with_capacity(ring.len());
    for &p in ring {
        if !p.0.is_finite() || !p.1.is_finite() {
            return None;
        }
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    // Drop straight-through vertices until none are left
    loop {
        let n = points.len();
        if n < 3 {
            return None;
        }
        let straight = (0..n).find(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            turn(prev, points[i], next) == 0.0
        });
        match straight {
            Some(i) => {
                points.remove(i);
            }
            None => break,
        }
    }

    let area = signed_area(&points);
    if area == 0.0 {
        return None;
    }
    let is_ccw = area > 0.0;
    if is_ccw != (winding == Winding::CounterClockwise) {
        points.reverse();
    }
    Some(points)
}

/// Shoelace area, positive for counter-clockwise rings
fn signed_area(ring: &[(f32, f32)]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 as f64 * y1 as f64 - x1 as f64 * y0 as f64
        })
        .sum::<f64>()
        / 2.0
}
