/// A triangle for STL output
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Three vertices: [[x, y, z], [x, y, z], [x, y, z]]
    pub vertices: [[f32; 3]; 3],
    /// Unit normal following the right-hand rule
    pub normal: [f32; 3],
}

impl Triangle {
    /// Create a new triangle and calculate its normal
    pub fn new(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Self {
        let vertices = [v0, v1, v2];
        Self {
            normal: calculate_normal(&vertices),
            vertices,
        }
    }

    pub fn min_z(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v[2])
            .fold(f32::INFINITY, f32::min)
    }

    pub fn max_z(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v[2])
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Unit normal by the cross product, `+Z` for degenerate triangles
pub(crate) fn calculate_normal(vertices: &[[f32; 3]; 3]) -> [f32; 3] {
    let [v0, v1, v2] = *vertices;
    let u = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let v = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

    let nx = u[1] * v[2] - u[2] * v[1];
    let ny = u[2] * v[0] - u[0] * v[2];
    let nz = u[0] * v[1] - u[1] * v[0];

    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len > 1e-10 {
        [nx / len, ny / len, nz / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Accumulator for building triangle meshes
#[derive(Debug, Default)]
pub struct MeshBuilder {
    triangles: Vec<Triangle>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_triangle(&mut self, v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) {
        self.triangles.push(Triangle::new(v0, v1, v2));
    }

    /// Add a quad (two triangles); vertices counter-clockwise seen from outside
    pub fn add_quad(&mut self, v0: [f32; 3], v1: [f32; 3], v2: [f32; 3], v3: [f32; 3]) {
        self.add_triangle(v0, v1, v2);
        self.add_triangle(v0, v2, v3);
    }

    /// Vertical wall along `from → to`, facing right of the direction of travel
    pub fn add_wall(&mut self, from: (f32, f32), to: (f32, f32), z_bottom: f32, z_top: f32) {
        self.add_quad(
            [from.0, from.1, z_bottom],
            [to.0, to.1, z_bottom],
            [to.0, to.1, z_top],
            [from.0, from.1, z_top],
        );
    }

    pub fn extend(&mut self, triangles: impl IntoIterator<Item = Triangle>) {
        self.triangles.extend(triangles);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn finish(self) -> Vec<Triangle> {
        self.triangles
    }
}
