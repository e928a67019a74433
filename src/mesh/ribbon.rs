use super::{MeshBuilder, Triangle};

/// Longest miter, as a multiple of the half width, before a joint is clamped
const MITER_LIMIT: f32 = 3.0;

/// Extrude a 2D polyline into a closed ribbon of constant width
///
/// Interior joints are mitered so consecutive pieces share their cross
/// section; sharp turns clamp the miter to `MITER_LIMIT` half widths.
///
/// # Arguments
/// * `points` - 2D points in mm [(x, y), ...]
/// * `width` - Ribbon width in mm
/// * `z_bottom`, `z_top` - Vertical extent in mm
pub fn extrude_ribbon(
    points: &[(f32, f32)],
    width: f32,
    z_bottom: f32,
    z_top: f32,
) -> Vec<Triangle> {
    let points = dedup(points);
    if points.len() < 2 || width <= 0.0 || !(z_top > z_bottom) {
        return Vec::new();
    }

    let half_width = width / 2.0;
    let edges: Vec<((f32, f32), (f32, f32))> = (0..points.len())
        .map(|i| {
            let (offset_x, offset_y) = offset(&points, i, half_width);
            let (x, y) = points[i];
            ((x + offset_x, y + offset_y), (x - offset_x, y - offset_y))
        })
        .collect();

    let mut builder = MeshBuilder::new();
    let at = |(x, y): (f32, f32), z: f32| [x, y, z];

    for pair in edges.windows(2) {
        let ((l0, r0), (l1, r1)) = (pair[0], pair[1]);

        builder.add_quad(at(r0, z_top), at(r1, z_top), at(l1, z_top), at(l0, z_top));
        builder.add_quad(
            at(r0, z_bottom),
            at(l0, z_bottom),
            at(l1, z_bottom),
            at(r1, z_bottom),
        );
        builder.add_wall(r0, r1, z_bottom, z_top);
        builder.add_wall(l1, l0, z_bottom, z_top);
    }

    let (l_start, r_start) = edges[0];
    builder.add_wall(l_start, r_start, z_bottom, z_top);
    let (l_end, r_end) = edges[edges.len() - 1];
    builder.add_wall(r_end, l_end, z_bottom, z_top);

    builder.finish()
}

/// Vector from the centerline to the left edge at point `i`
fn offset(points: &[(f32, f32)], i: usize, half_width: f32) -> (f32, f32) {
    let last = points.len() - 1;
    let incoming = (i > 0).then(|| direction(points[i - 1], points[i]));
    let outgoing = (i < last).then(|| direction(points[i], points[i + 1]));

    let (dx, dy) = match (incoming, outgoing) {
        (Some(d1), Some(d2)) => normalize((d1.0 + d2.0, d1.1 + d2.1)).unwrap_or(d2),
        (Some(d), None) | (None, Some(d)) => d,
        (None, None) => (1.0, 0.0),
    };
    let (nx, ny) = (-dy, dx);

    // A miter stretches by 1 / cos(half the turning angle)
    let cos_half = match outgoing {
        Some(d2) => (nx * -d2.1 + ny * d2.0).abs(),
        None => 1.0,
    };
    let stretch = (1.0 / cos_half.max(1e-6)).min(MITER_LIMIT);
    (nx * half_width * stretch, ny * half_width * stretch)
}

fn dedup(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}

fn direction(from: (f32, f32), to: (f32, f32)) -> (f32, f32) {
    normalize((to.0 - from.0, to.1 - from.1)).unwrap_or((1.0, 0.0))
}

fn normalize((x, y): (f32, f32)) -> Option<(f32, f32)> {
    let len = (x * x + y * y).sqrt();
    (len > 1e-10).then(|| (x / len, y / len))
}
