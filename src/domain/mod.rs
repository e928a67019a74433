pub mod elevation;
pub mod landuse;
pub mod road;

pub use elevation::{ContourPolygon, ElevationBand, ElevationRange};
pub use landuse::{DEFAULT_LANDUSE, LanduseArea, RawLanduse};
pub use road::{NetworkType, RawRoad, RoadClass, RoadSegment, parse_lanes};
