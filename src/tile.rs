//! One hexagon of a job and the layers fetched for it.

use geo::Coord;

use crate::api::{ContourSource, LanduseSource, RetryPolicy, RoadSource};
use crate::domain::{ElevationBand, ElevationRange, LanduseArea, NetworkType, RoadSegment};
use crate::error::TileError;
use crate::geometry::{Hexagon, Projector};
use crate::layers::{ElevationLayerBuilder, LanduseLayerBuilder, RoadLayerBuilder, overlay};

/// Collaborators and settings shared by every tile fetch
#[derive(Clone, Copy)]
pub struct FetchContext<'a> {
    pub projector: &'a Projector,
    pub contours: &'a dyn ContourSource,
    pub roads: &'a dyn RoadSource,
    /// No land use is fetched without a source
    pub landuse: Option<&'a dyn LanduseSource>,
    pub landuse_kind: &'a str,
    pub step_m: f64,
    pub margin: f64,
    pub network: NetworkType,
    pub retry: RetryPolicy,
}

/// Everything fetched for one tile, fixed once `fetch()` returns
#[derive(Debug, Clone, Default)]
pub struct TileLayers {
    pub bands: Vec<ElevationBand>,
    /// Overlaid with the bands when there are any
    pub roads: Vec<RoadSegment>,
    pub landuse: Vec<LanduseArea>,
    /// Elevations of this tile only
    pub range: ElevationRange,
    /// Layers that came back empty because their fetch failed
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Tile {
    index: usize,
    hexagon: Hexagon,
    layers: Option<TileLayers>,
}

impl Tile {
    pub fn new(index: usize, hexagon: Hexagon) -> Self {
        Self {
            index,
            hexagon,
            layers: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hexagon(&self) -> &Hexagon {
        &self.hexagon
    }

    pub fn center(&self) -> Coord<f64> {
        self.hexagon.center()
    }

    pub fn is_fetched(&self) -> bool {
        self.layers.is_some()
    }

    /// Fetch elevation bands, roads and land use, returning this tile's elevation range
    ///
    /// A layer whose fetch fails stays empty and is noted in
    /// [`TileLayers::warnings`]. Projection and frame errors fail the tile.
    /// Calling it again returns the stored range without fetching.
    pub fn fetch(&mut self, ctx: &FetchContext<'_>) -> Result<ElevationRange, TileError> {
        if let Some(layers) = &self.layers {
            return Ok(layers.range);
        }

        log::info!("Fetching hexagon {} at {:?}", self.index, self.center());
        let mut warnings = Vec::new();

        let elevation = ElevationLayerBuilder::new(ctx.contours, ctx.projector)
            .with_margin(ctx.margin)
            .with_retry(ctx.retry)
            .build(&self.hexagon, ctx.step_m, ElevationRange::empty());
        let (bands, range) = match elevation {
            Ok(result) => result,
            Err(TileError::Fetch(err)) => {
                log::warn!("Hexagon {}: elevation unavailable: {}", self.index, err);
                warnings.push(format!("elevation: {}", err));
                (Vec::new(), ElevationRange::empty())
            }
            Err(err) => return Err(err),
        };

        let roads = RoadLayerBuilder::new(ctx.roads, ctx.projector)
            .with_network(ctx.network)
            .with_retry(ctx.retry)
            .build(&self.hexagon);
        let roads = match roads {
            Ok(roads) => roads,
            Err(TileError::Fetch(err)) => {
                log::warn!("Hexagon {}: roads unavailable: {}", self.index, err);
                warnings.push(format!("roads: {}", err));
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        let roads = if bands.is_empty() {
            roads
        } else {
            overlay(&roads, &bands)?
        };

        let landuse = match ctx.landuse {
            Some(source) => {
                let landuse = LanduseLayerBuilder::new(source, ctx.projector)
                    .with_kind(ctx.landuse_kind)
                    .with_retry(ctx.retry)
                    .build(&self.hexagon);
                match landuse {
                    Ok(areas) => areas,
                    Err(TileError::Fetch(err)) => {
                        log::warn!("Hexagon {}: land use unavailable: {}", self.index, err);
                        warnings.push(format!("landuse: {}", err));
                        Vec::new()
                    }
                    Err(err) => return Err(err),
                }
            }
            None => Vec::new(),
        };

        log::info!(
            "Hexagon {}: {} bands, {} road segments, {} land-use areas",
            self.index,
            bands.len(),
            roads.len(),
            landuse.len()
        );
        self.layers = Some(TileLayers {
            bands,
            roads,
            landuse,
            range,
            warnings,
        });
        Ok(range)
    }

    pub fn layers(&self) -> Result<&TileLayers, TileError> {
        self.layers.as_ref().ok_or(TileError::NotFetched)
    }

    pub fn elevation_bands(&self) -> Result<&[ElevationBand], TileError> {
        Ok(&self.layers()?.bands)
    }

    pub fn roads(&self) -> Result<&[RoadSegment], TileError> {
        Ok(&self.layers()?.roads)
    }

    pub fn landuse(&self) -> Result<&[LanduseArea], TileError> {
        Ok(&self.layers()?.landuse)
    }
}
