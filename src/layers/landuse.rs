use geo::MultiPolygon;

use crate::api::{LanduseSource, RetryPolicy};
use crate::domain::{DEFAULT_LANDUSE, LanduseArea};
use crate::error::TileError;
use crate::geometry::{Hexagon, Projector, clip_polygons};
use crate::layers::query_areas;

/// Builds the land-use areas of one hexagon
pub struct LanduseLayerBuilder<'a> {
    source: &'a dyn LanduseSource,
    projector: &'a Projector,
    kind: &'a str,
    retry: RetryPolicy,
}

impl<'a> LanduseLayerBuilder<'a> {
    pub fn new(source: &'a dyn LanduseSource, projector: &'a Projector) -> Self {
        Self {
            source,
            projector,
            kind: DEFAULT_LANDUSE,
            retry: RetryPolicy::default(),
        }
    }

    /// `landuse` tag value to fetch
    pub fn with_kind(mut self, kind: &'a str) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Areas inside `hexagon`, in the projected frame
    pub fn build(&self, hexagon: &Hexagon) -> Result<Vec<LanduseArea>, TileError> {
        let mut areas = Vec::new();
        for (query, mask) in query_areas(self.projector, hexagon)? {
            let raw = self.retry.run("land use", || {
                self.source.fetch_landuse(&query, self.kind)
            })?;

            for area in raw {
                let projected = self.projector.polygon_to_projected(&area.polygon)?;
                match clip_polygons(&MultiPolygon::new(vec![projected]), &mask) {
                    Ok(clipped) if clipped.0.is_empty() => {}
                    Ok(clipped) => areas.push(LanduseArea {
                        polygon: clipped,
                        kind: area.kind,
                        crs: self.projector.crs(),
                    }),
                    Err(err) => log::warn!("Skipping {} area: {}", area.kind, err),
                }
            }
        }

        log::debug!(
            "{} {} areas in hexagon at {:?}",
            areas.len(),
            self.kind,
            hexagon.center()
        );
        Ok(areas)
    }
}
