pub mod builder;
pub mod extrusion;
pub mod ribbon;
pub mod stl;
pub mod terrain;
pub mod triangulation;
pub mod validation;
pub mod volume;

pub use builder::{MeshBuilder, Triangle};
pub use extrusion::{extrude_normalized, extrude_polygon};
pub use ribbon::extrude_ribbon;
pub use stl::{estimate_stl_size, write_mesh, write_stl};
pub use terrain::{ExtrusionParams, RoadParams, extrude, extrude_roads};
pub use validation::{ValidationReport, validate_mesh};
pub use volume::{Mesh, Rgb, Volume};
