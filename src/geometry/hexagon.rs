use geo::{Coord, LineString, Polygon, Rect, coord};

use crate::error::GridError;

/// Axial step vectors walking one ring, in units of (3s/2, s)
const RING_STEPS: [(f64, f64); 6] = [
    (1.0, -1.0),
    (1.0, 1.0),
    (0.0, 2.0),
    (-1.0, 1.0),
    (-1.0, -1.0),
    (0.0, -2.0),
];

/// A flat-top hexagonal tile in the projected frame
///
/// `size` is the circumradius. The polygon is `2 * size` wide and tall, and
/// neighbors sit at offsets `(±1.5 * size, ±size)` and `(0, ±2 * size)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hexagon {
    center: Coord<f64>,
    size: f64,
}

impl Hexagon {
    pub fn new(center: Coord<f64>, size: f64) -> Result<Self, GridError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(GridError::InvalidSize(size));
        }
        if !center.x.is_finite() || !center.y.is_finite() {
            return Err(GridError::InvalidBounds {
                left: center.x,
                bottom: center.y,
                right: center.x,
                top: center.y,
            });
        }
        Ok(Self { center, size })
    }

    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Outline, counter-clockwise, closed
    pub fn polygon(&self) -> Polygon<f64> {
        let Coord { x, y } = self.center;
        let s = self.size;

        let ring = LineString::from(vec![
            coord! { x: x - s / 2.0, y: y + s },
            coord! { x: x - s, y: y },
            coord! { x: x - s / 2.0, y: y - s },
            coord! { x: x + s / 2.0, y: y - s },
            coord! { x: x + s, y: y },
            coord! { x: x + s / 2.0, y: y + s },
            coord! { x: x - s / 2.0, y: y + s },
        ]);
        Polygon::new(ring, vec![])
    }

    /// (left, bottom, right, top)
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        let Coord { x, y } = self.center;
        let s = self.size;
        (x - s, y - s, x + s, y + s)
    }

    pub fn bounding_rect(&self) -> Rect<f64> {
        let (left, bottom, right, top) = self.bbox();
        Rect::new(coord! { x: left, y: bottom }, coord! { x: right, y: top })
    }

    /// The `6 * ring_distance` hexagons at exactly `ring_distance` steps
    pub fn get_neighbors(&self, ring_distance: u32) -> Vec<Hexagon> {
        let d = ring_distance as f64;
        let step_x = 1.5 * self.size;
        let step_y = self.size;

        let mut x = self.center.x - step_x * d;
        let mut y = self.center.y - step_y * d;

        let mut ring = Vec::with_capacity(6 * ring_distance as usize);
        for &(dx, dy) in &RING_STEPS {
            for _ in 0..ring_distance {
                ring.push(Hexagon {
                    center: coord! { x: x, y: y },
                    size: self.size,
                });
                x += dx * step_x;
                y += dy * step_y;
            }
        }
        ring
    }
}

/// Center hexagon followed by every ring up to `radius`
pub fn rings(center: Coord<f64>, size: f64, radius: u32) -> Result<Vec<Hexagon>, GridError> {
    let origin = Hexagon::new(center, size)?;
    let mut grid = vec![origin];
    for d in 1..=radius {
        grid.extend(origin.get_neighbors(d));
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{Area, BooleanOps, MultiPolygon, Winding};
    use std::collections::HashSet;

    fn lattice_key(hexagon: &Hexagon, origin: &Hexagon) -> (i64, i64) {
        let s = origin.size();
        let i = (hexagon.center().x - origin.center().x) / (1.5 * s);
        let j = (hexagon.center().y - origin.center().y) / s;
        (i.round() as i64, j.round() as i64)
    }

    /// 60 degree rotation of the lattice: maps each ring step onto the next
    fn rotate((i, j): (i64, i64)) -> (i64, i64) {
        ((i - j) / 2, (3 * i + j) / 2)
    }

    fn segments_cross(a: (Coord, Coord), b: (Coord, Coord)) -> bool {
        fn orient(p: Coord, q: Coord, r: Coord) -> f64 {
            (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
        }
        let d1 = orient(b.0, b.1, a.0);
        let d2 = orient(b.0, b.1, a.1);
        let d3 = orient(a.0, a.1, b.0);
        let d4 = orient(a.0, a.1, b.1);
        d1 * d2 < 0.0 && d3 * d4 < 0.0
    }

    #[test]
    fn test_polygon_vertices() {
        for &size in &[0.5, 1.0, 650.0, 12_345.0] {
            let hexagon = Hexagon::new(coord! { x: 10.0, y: -4.0 }, size).unwrap();
            let polygon = hexagon.polygon();
            let coords: Vec<Coord> = polygon.exterior().coords().copied().collect();

            assert_eq!(coords.len(), 7);
            assert_eq!(coords[0], coords[6]);

            let distinct: HashSet<(u64, u64)> = coords[..6]
                .iter()
                .map(|c| (c.x.to_bits(), c.y.to_bits()))
                .collect();
            assert_eq!(distinct.len(), 6);
            assert!(polygon.exterior().is_ccw());
        }
    }

    #[test]
    fn test_polygon_is_simple() {
        let hexagon = Hexagon::new(coord! { x: 0.0, y: 0.0 }, 3.0).unwrap();
        let coords: Vec<Coord> = hexagon.polygon().exterior().coords().copied().collect();
        let edges: Vec<(Coord, Coord)> = coords.windows(2).map(|w| (w[0], w[1])).collect();

        for (i, a) in edges.iter().enumerate() {
            for b in edges.iter().skip(i + 2) {
                assert!(!segments_cross(*a, *b));
            }
        }
    }

    #[test]
    fn test_bbox() {
        let hexagon = Hexagon::new(coord! { x: 3.0, y: 7.0 }, 2.0).unwrap();
        assert_eq!(hexagon.bbox(), (1.0, 5.0, 5.0, 9.0));

        let rect = hexagon.bounding_rect();
        assert_eq!(rect.min(), coord! { x: 1.0, y: 5.0 });
        assert_eq!(rect.max(), coord! { x: 5.0, y: 9.0 });
    }

    #[test]
    fn test_invalid_size() {
        assert!(Hexagon::new(coord! { x: 0.0, y: 0.0 }, 0.0).is_err());
        assert!(Hexagon::new(coord! { x: 0.0, y: 0.0 }, -1.0).is_err());
        assert!(Hexagon::new(coord! { x: 0.0, y: 0.0 }, f64::NAN).is_err());
    }

    #[test]
    fn test_neighbor_counts() {
        let hexagon = Hexagon::new(coord! { x: 0.0, y: 0.0 }, 1.0).unwrap();
        assert!(hexagon.get_neighbors(0).is_empty());
        for d in 1..=5 {
            assert_eq!(hexagon.get_neighbors(d).len(), 6 * d as usize);
        }
    }

    #[test]
    fn test_first_ring_centers() {
        let hexagon = Hexagon::new(coord! { x: 0.0, y: 0.0 }, 2.0).unwrap();
        let centers: Vec<(f64, f64)> = hexagon
            .get_neighbors(1)
            .iter()
            .map(|h| (h.center().x, h.center().y))
            .collect();

        assert_eq!(
            centers,
            vec![
                (-3.0, -2.0),
                (0.0, -4.0),
                (3.0, -2.0),
                (3.0, 2.0),
                (0.0, 4.0),
                (-3.0, 2.0),
            ]
        );
    }

    #[test]
    fn test_ring_rotational_symmetry() {
        let hexagon = Hexagon::new(coord! { x: 100.0, y: 50.0 }, 4.0).unwrap();
        for d in 1..=4 {
            let keys: HashSet<(i64, i64)> = hexagon
                .get_neighbors(d)
                .iter()
                .map(|h| lattice_key(h, &hexagon))
                .collect();
            let rotated: HashSet<(i64, i64)> = keys.iter().map(|&k| rotate(k)).collect();

            assert_eq!(keys.len(), 6 * d as usize);
            assert_eq!(keys, rotated);
        }
    }

    #[test]
    fn test_rings_tile_without_gaps_or_overlaps() {
        let size = 10.0;
        let grid = rings(coord! { x: 0.0, y: 0.0 }, size, 2).unwrap();
        assert_eq!(grid.len(), 1 + 6 + 12);

        let single = grid[0].polygon().unsigned_area();
        for (i, a) in grid.iter().enumerate() {
            for b in grid.iter().skip(i + 1) {
                let overlap = a.polygon().intersection(&b.polygon()).unsigned_area();
                assert!(overlap < single * 1e-6);
            }
        }

        // Every first-ring hexagon shares exactly one edge with the center one
        let center: HashSet<(u64, u64)> = grid[0]
            .polygon()
            .exterior()
            .coords()
            .map(|c| (c.x.to_bits(), c.y.to_bits()))
            .collect();
        for neighbor in &grid[1..7] {
            let shared = neighbor
                .polygon()
                .exterior()
                .coords()
                .take(6)
                .filter(|c| center.contains(&(c.x.to_bits(), c.y.to_bits())))
                .count();
            assert_eq!(shared, 2);
        }

        let union = grid
            .iter()
            .fold(MultiPolygon::new(vec![]), |acc, h| {
                acc.union(&MultiPolygon::new(vec![h.polygon()]))
            });
        assert_abs_diff_eq!(union.unsigned_area(), 19.0 * single, epsilon = 1e-3);
        assert_abs_diff_eq!(single, 3.0 * size * size, epsilon = 1e-9);
    }
}
