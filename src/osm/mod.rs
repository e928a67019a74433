pub mod parser;

pub use parser::{parse_landuse, parse_roads};
