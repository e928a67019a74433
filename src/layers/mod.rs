pub mod elevation;
pub mod landuse;
pub mod roads;

pub use elevation::ElevationLayerBuilder;
pub use landuse::LanduseLayerBuilder;
pub use roads::{RoadLayerBuilder, overlay};

use geo::Polygon;

use crate::error::TileError;
use crate::geometry::{Hexagon, Projector, split_at_antimeridian};

/// Geographic areas to query for `hexagon`, each with its projected clip mask
///
/// One pair normally; two when the hexagon straddles the antimeridian, so
/// that a feature returned for both halves is kept once per half.
pub(crate) fn query_areas(
    projector: &Projector,
    hexagon: &Hexagon,
) -> Result<Vec<(Polygon<f64>, Polygon<f64>)>, TileError> {
    let outline = hexagon.polygon();
    let geographic = projector.polygon_to_geographic(&outline)?;
    let parts = split_at_antimeridian(&geographic)?;
    if parts.len() == 1 {
        return Ok(parts.into_iter().map(|area| (area, outline.clone())).collect());
    }

    parts
        .into_iter()
        .map(|area| -> Result<_, TileError> {
            let mask = projector.polygon_to_projected(&area)?;
            Ok((area, mask))
        })
        .collect()
}
