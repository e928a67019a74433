pub mod geojson;

pub use geojson::{FeatureCollection, GeoJsonExporter, tile_stem};
