use earcutr::earcut;

/// Ear-clipping triangulation of a polygon with holes
///
/// Indices refer to the outer ring followed by each hole, in order. An
/// empty result means the polygon could not be triangulated.
pub fn triangulate_polygon(outer: &[(f32, f32)], holes: &[Vec<(f32, f32)>]) -> Vec<[usize; 3]> {
    if outer.len() < 3 {
        return Vec::new();
    }

    let mut vertices: Vec<f64> =
        Vec::with_capacity((outer.len() + holes.iter().map(|h| h.len()).sum::<usize>()) * 2);
    let mut hole_indices: Vec<usize> = Vec::with_capacity(holes.len());

    for &(x, y) in outer {
        vertices.push(x as f64);
        vertices.push(y as f64);
    }

    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        for &(x, y) in hole {
            vertices.push(x as f64);
            vertices.push(y as f64);
        }
    }

    earcut(&vertices, &hole_indices, 2)
        .unwrap_or_default()
        .chunks_exact(3)
        .map(|tri| [tri[0], tri[1], tri[2]])
        .collect()
}

/// Twice the signed area of (p, q, r), computed the way ear clipping does
///
/// Zero means the three points are collinear, and ear clipping drops `q`.
pub(crate) fn turn(p: (f32, f32), q: (f32, f32), r: (f32, f32)) -> f64 {
    let (px, py) = (p.0 as f64, p.1 as f64);
    let (qx, qy) = (q.0 as f64, q.1 as f64);
    let (rx, ry) = (r.0 as f64, r.1 as f64);
    (qy - py) * (rx - qx) - (qx - px) * (ry - qy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangulate_square() {
        let square = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let triangles = triangulate_polygon(&square, &[]);
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_triangulate_empty() {
        let empty: Vec<(f32, f32)> = vec![];
        assert!(triangulate_polygon(&empty, &[]).is_empty());
    }

    #[test]
    fn test_triangulate_with_hole() {
        let outer = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let hole = vec![(2.0, 2.0), (2.0, 8.0), (8.0, 8.0), (8.0, 2.0)];
        let triangles = triangulate_polygon(&outer, &[hole]);

        // 8 vertices, one hole: n + 2h - 2 triangles
        assert_eq!(triangles.len(), 8);
        assert!(triangles.iter().flatten().all(|&i| i < 8));
    }

    #[test]
    fn test_turn_detects_collinear() {
        assert_eq!(turn((0.0, 0.0), (1.0, 0.0), (2.0, 0.0)), 0.0);
        assert_ne!(turn((0.0, 0.0), (1.0, 0.0), (1.0, 1.0)), 0.0);
    }
}
