use geo::{Coord, Rect};

/// Bounding box in projected coordinates (meters)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Grow every side by `fraction` of the width/height
    pub fn with_margin(&self, fraction: f64) -> Self {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Self {
            min_x: self.min_x - dx,
            max_x: self.max_x + dx,
            min_y: self.min_y - dy,
            max_y: self.max_y + dy,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_x: rect.min().x,
            max_x: rect.max().x,
            min_y: rect.min().y,
            max_y: rect.max().y,
        }
    }
}

/// Maps projected meters onto a fixed physical footprint in mm
///
/// Translates the bounds' minimum corner to the origin, then scales uniformly
/// so the larger dimension spans the target size. Every tile computes its own
/// params from its hexagon; bands reuse the hexagon's params.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationParams {
    pub x_offset: f64,
    pub y_offset: f64,
    /// mm per meter
    pub scale: f64,
}

impl NormalizationParams {
    pub fn from_bounds(bounds: &Bounds, target_mm: f64) -> Self {
        let max_dim = bounds.width().max(bounds.height());
        let scale = if max_dim > 0.0 {
            target_mm / max_dim
        } else {
            1.0
        };

        Self {
            x_offset: bounds.min_x,
            y_offset: bounds.min_y,
            scale,
        }
    }

    /// Normalize a point from meters to mm
    ///
    /// # Returns
    /// * (x, y) in mm as f32 for STL output
    pub fn apply(&self, x: f64, y: f64) -> (f32, f32) {
        (
            ((x - self.x_offset) * self.scale) as f32,
            ((y - self.y_offset) * self.scale) as f32,
        )
    }

    pub fn apply_coords<'a>(&self, coords: impl Iterator<Item = &'a Coord<f64>>) -> Vec<(f32, f32)> {
        coords.map(|c| self.apply(c.x, c.y)).collect()
    }
}
