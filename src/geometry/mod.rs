pub mod clip;
pub mod grid;
pub mod hexagon;
pub mod projection;
pub mod scaling;
pub mod simplify;

pub use clip::{clip_lines, clip_polygons, split_at_antimeridian};
pub use grid::distribute;
pub use hexagon::{Hexagon, rings};
pub use projection::{Crs, Projector};
pub use scaling::{Bounds, NormalizationParams};
