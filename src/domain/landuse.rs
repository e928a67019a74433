use geo::{MultiPolygon, Polygon};

use crate::geometry::Crs;

/// Land-use tag value fetched when nothing else is configured
pub const DEFAULT_LANDUSE: &str = "residential";

/// A land-use area as returned by the land-use collaborator, geographic
#[derive(Debug, Clone, PartialEq)]
pub struct RawLanduse {
    pub polygon: Polygon<f64>,
    /// Value of the `landuse` tag
    pub kind: String,
}

impl RawLanduse {
    pub fn new(polygon: Polygon<f64>, kind: impl Into<String>) -> Self {
        Self {
            polygon,
            kind: kind.into(),
        }
    }
}

/// A land-use area clipped to one hexagon
#[derive(Debug, Clone, PartialEq)]
pub struct LanduseArea {
    pub polygon: MultiPolygon<f64>,
    pub kind: String,
    pub crs: Crs,
}
