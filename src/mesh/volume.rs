use std::fmt;

use super::Triangle;

/// 8-bit sRGB color of a printed volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Linear blend, `t` clamped to [0, 1]
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// One printable solid: the base slab, a band, or the road network
#[derive(Debug, Clone)]
pub struct Volume {
    pub name: String,
    pub color: Rgb,
    pub triangles: Vec<Triangle>,
}

impl Volume {
    pub fn new(name: impl Into<String>, color: Rgb, triangles: Vec<Triangle>) -> Self {
        Self {
            name: name.into(),
            color,
            triangles,
        }
    }

    /// (min z, max z) in mm, `None` for an empty volume
    pub fn z_range(&self) -> Option<(f32, f32)> {
        if self.triangles.is_empty() {
            return None;
        }
        let min = self.triangles.iter().map(Triangle::min_z).fold(f32::INFINITY, f32::min);
        let max = self
            .triangles
            .iter()
            .map(Triangle::max_z)
            .fold(f32::NEG_INFINITY, f32::max);
        Some((min, max))
    }
}

/// Ordered volumes of one tile: base slab first, bands by rising elevation,
/// then roads
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub volumes: Vec<Volume>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.volumes.iter().map(|v| v.triangles.len()).sum()
    }

    /// All triangles of all volumes, in volume order
    pub fn triangles(&self) -> impl Iterator<Item = &Triangle> {
        self.volumes.iter().flat_map(|v| v.triangles.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_lerp_and_display() {
        let green = Rgb(0, 128, 0);
        let white = Rgb(255, 255, 255);

        assert_eq!(green.lerp(white, 0.0), green);
        assert_eq!(green.lerp(white, 1.0), white);
        assert_eq!(green.lerp(white, 2.0), white);
        assert_eq!(Rgb(0, 0, 0).lerp(Rgb(200, 100, 50), 0.5), Rgb(100, 50, 25));
        assert_eq!(Rgb(255, 8, 171).to_string(), "#ff08ab");
    }

    #[test]
    fn test_mesh_counts() {
        let tri = Triangle::new([0.0, 0.0, 1.0], [1.0, 0.0, 2.0], [0.0, 1.0, 3.0]);
        let mesh = Mesh {
            volumes: vec![
                Volume::new("base", Rgb(0, 0, 0), vec![tri.clone(), tri.clone()]),
                Volume::new("empty", Rgb(0, 0, 0), vec![]),
            ],
        };

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles().count(), 2);
        assert_eq!(mesh.volumes[0].z_range(), Some((1.0, 3.0)));
        assert_eq!(mesh.volumes[1].z_range(), None);
    }
}
