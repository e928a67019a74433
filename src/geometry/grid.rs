use geo::coord;

use super::Hexagon;
use crate::error::GridError;

/// Cover `bbox` (left, bottom, right, top) with edge-adjacent hexagons
///
/// Brick pattern: horizontal pitch `3 * size`, vertical pitch `size`, odd
/// rows shifted right by half the horizontal pitch. The first hexagon is
/// centered on the lower-left corner and the fill runs row by row, left to
/// right, for as long as the next footprint still reaches into the box.
///
/// Tiles reach past the box by up to one hexagon, and centers may lie
/// outside it, so every point of the box is covered.
pub fn distribute(bbox: (f64, f64, f64, f64), hex_size: f64) -> Result<Vec<Hexagon>, GridError> {
    let (left, bottom, right, top) = bbox;
    if !hex_size.is_finite() || hex_size <= 0.0 {
        return Err(GridError::InvalidSize(hex_size));
    }
    let finite = [left, bottom, right, top].iter().all(|v| v.is_finite());
    if !finite || left > right || bottom > top {
        return Err(GridError::InvalidBounds {
            left,
            bottom,
            right,
            top,
        });
    }

    let horizontal_pitch = 3.0 * hex_size;
    let vertical_pitch = hex_size;

    let mut hexagons = Vec::new();
    let mut row: u32 = 0;
    loop {
        let y = bottom + row as f64 * vertical_pitch;
        // The second row closes the gaps along the bottom edge, so a flat box
        // still needs it
        if row >= 2 && y - hex_size >= top {
            break;
        }

        let mut x = if row % 2 == 1 {
            left + horizontal_pitch / 2.0
        } else {
            left
        };
        while x - hex_size < right {
            hexagons.push(Hexagon::new(coord! { x: x, y: y }, hex_size)?);
            x += horizontal_pitch;
        }
        row += 1;
    }

    Ok(hexagons)
}
