//! One tiling job from layout to files on disk.
//!
//! The job runs in two phases. Every tile is fetched first, on a bounded
//! worker pool, and the per-tile elevation ranges are merged. Only then are
//! tiles extruded, so that all of them share one elevation offset and one
//! color scale.

use std::fs;
use std::path::{Path, PathBuf};

use geo::{Coord, coord};
use rayon::prelude::*;

use crate::api::{ContourSource, LanduseSource, RetryPolicy, RoadSource};
use crate::domain::{DEFAULT_LANDUSE, ElevationRange, NetworkType};
use crate::error::{ExportError, GridError, PipelineError, TileError};
use crate::export::{GeoJsonExporter, tile_stem};
use crate::geometry::{Hexagon, Projector, distribute, rings};
use crate::layers::ElevationLayerBuilder;
use crate::mesh::{ExtrusionParams, Mesh, RoadParams, extrude, extrude_roads, write_mesh};
use crate::tile::{FetchContext, Tile};

pub const OVERVIEW_FILE: &str = "grid.geojson";

/// How hexagons are laid out around the job's origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridLayout {
    /// Center hexagon and `radius` rings around it
    Rings { radius: u32 },
    /// Brick pattern covering a square of ± `half_extent_m` meters
    Cover { half_extent_m: f64 },
}

/// Parameters of one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    /// Hexagon circumradius in meters
    pub hex_size_m: f64,
    pub layout: GridLayout,
    /// Contour interval in meters
    pub step_m: f64,
    /// Printed height of one contour interval
    pub step_mm: f64,
    pub footprint_mm: f64,
    pub base_height_mm: f64,
    /// Contour query margin around each hexagon, as a fraction of its size
    pub margin: f64,
    pub network: NetworkType,
    /// Add road ribbons to the meshes (roads are always exported as GeoJSON)
    pub road_ribbons: bool,
    pub road: RoadParams,
    /// `landuse` tag value exported next to roads and contours
    pub landuse_kind: String,
    pub split_volumes: bool,
    /// Write GeoJSON in local meters instead of lon/lat
    pub projected_geojson: bool,
    pub max_concurrent: usize,
    pub retry: RetryPolicy,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            hex_size_m: 1000.0,
            layout: GridLayout::Rings { radius: 1 },
            step_m: 10.0,
            step_mm: 0.4,
            footprint_mm: 100.0,
            base_height_mm: 3.0,
            margin: ElevationLayerBuilder::DEFAULT_MARGIN,
            network: NetworkType::Drive,
            road_ribbons: true,
            road: RoadParams::default(),
            landuse_kind: DEFAULT_LANDUSE.to_string(),
            split_volumes: false,
            projected_geojson: false,
            max_concurrent: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl JobParams {
    pub fn elevation_scale_mm_per_m(&self) -> f64 {
        self.step_mm / self.step_m
    }
}

/// A tile whose fetch failed outright
#[derive(Debug, Clone, PartialEq)]
pub struct TileFailure {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileStatus {
    Done { volumes: usize, triangles: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileReport {
    pub index: usize,
    /// Projected meters
    pub center: Coord<f64>,
    pub status: TileStatus,
}

/// Outcome of a job
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub tiles: Vec<TileReport>,
    /// Job-wide elevation range, empty when no tile had contours
    pub range: ElevationRange,
    pub files: Vec<PathBuf>,
}

impl JobReport {
    pub fn done(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| matches!(t.status, TileStatus::Done { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.tiles.len() - self.done()
    }
}

pub struct Pipeline<'a> {
    params: JobParams,
    projector: Projector,
    contours: &'a dyn ContourSource,
    roads: &'a dyn RoadSource,
    landuse: Option<&'a dyn LanduseSource>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        params: JobParams,
        projector: Projector,
        contours: &'a dyn ContourSource,
        roads: &'a dyn RoadSource,
    ) -> Self {
        Self {
            params,
            projector,
            contours,
            roads,
            landuse: None,
        }
    }

    /// Also fetch and export land-use areas of `params().landuse_kind`
    pub fn with_landuse(mut self, source: &'a dyn LanduseSource) -> Self {
        self.landuse = Some(source);
        self
    }

    pub fn params(&self) -> &JobParams {
        &self.params
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Unfetched tiles of the job, centered on the projector's origin
    pub fn layout(&self) -> Result<Vec<Tile>, GridError> {
        let size = self.params.hex_size_m;
        let hexagons = match self.params.layout {
            GridLayout::Rings { radius } => rings(coord! { x: 0.0, y: 0.0 }, size, radius)?,
            GridLayout::Cover { half_extent_m } => {
                let h = half_extent_m;
                distribute((-h, -h, h, h), size)?
            }
        };
        Ok(hexagons
            .into_iter()
            .enumerate()
            .map(|(index, hexagon)| Tile::new(index, hexagon))
            .collect())
    }

    /// Fetch every tile on `max_concurrent` workers and merge their ranges
    pub fn fetch_tiles(
        &self,
        tiles: &mut [Tile],
    ) -> Result<(ElevationRange, Vec<TileFailure>), PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.max_concurrent.max(1))
            .build()?;
        let ctx = FetchContext {
            projector: &self.projector,
            contours: self.contours,
            roads: self.roads,
            landuse: self.landuse,
            landuse_kind: &self.params.landuse_kind,
            step_m: self.params.step_m,
            margin: self.params.margin,
            network: self.params.network,
            retry: self.params.retry,
        };

        let results: Vec<(usize, Result<ElevationRange, TileError>)> = pool.install(|| {
            tiles
                .par_iter_mut()
                .map(|tile| (tile.index(), tile.fetch(&ctx)))
                .collect()
        });

        let mut range = ElevationRange::empty();
        let mut failures = Vec::new();
        for (index, result) in results {
            match result {
                Ok(partial) => range = range.merge(partial),
                Err(err) => {
                    log::warn!("Hexagon {} failed: {}", index, err);
                    failures.push(TileFailure {
                        index,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok((range, failures))
    }

    /// Scale parameters every tile of the job is extruded with
    pub fn extrusion_params(&self, range: &ElevationRange) -> ExtrusionParams {
        let (offset, span) = if range.is_empty() {
            (0.0, self.params.step_m)
        } else {
            (range.min, range.span().max(self.params.step_m))
        };
        ExtrusionParams {
            frame: self.projector.crs(),
            target_footprint_mm: self.params.footprint_mm,
            base_height_mm: self.params.base_height_mm,
            elevation_scale_mm_per_m: self.params.elevation_scale_mm_per_m(),
            elevation_offset_m: offset,
            color_span_m: span,
        }
    }

    /// Mesh of a fetched tile, with the job-wide `range` as reference
    pub fn extrude_tile(&self, tile: &Tile, range: &ElevationRange) -> Result<Mesh, TileError> {
        let layers = tile.layers()?;
        let params = self.extrusion_params(range);

        let mut mesh = extrude(tile.hexagon(), &layers.bands, &params)?;
        if self.params.road_ribbons {
            let roads = extrude_roads(tile.hexagon(), &layers.roads, &params, &self.params.road)?;
            mesh.volumes.extend(roads);
        }
        Ok(mesh)
    }

    /// Write the tile's STL file(s) and its GeoJSON
    pub fn export_tile(
        &self,
        tile: &Tile,
        mesh: &Mesh,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExportError> {
        let stem = tile_stem(tile.index());
        let mut written = write_mesh(out_dir, &stem, mesh, self.params.split_volumes)?;

        let bands = tile.elevation_bands().unwrap_or_default();
        let roads = tile.roads().unwrap_or_default();
        let landuse = tile.landuse().unwrap_or_default();
        let path = out_dir.join(format!("{}.geojson", stem));
        self.exporter()
            .tile(tile.index(), tile.hexagon(), bands, roads, landuse)?
            .save(&path)?;
        written.push(path);

        Ok(written)
    }

    /// `grid.geojson` with every hexagon outline
    pub fn write_overview(&self, tiles: &[Tile], out_dir: &Path) -> Result<PathBuf, ExportError> {
        let hexagons: Vec<Hexagon> = tiles.iter().map(|t| *t.hexagon()).collect();
        let path = out_dir.join(OVERVIEW_FILE);
        self.exporter().grid(&hexagons)?.save(&path)?;
        Ok(path)
    }

    /// Extrude and export fetched tiles, calling `progress` after each one
    ///
    /// Tiles listed in `failures` are reported without being extruded. A tile
    /// that fails to extrude is reported and skipped; export errors abort.
    pub fn export_all(
        &self,
        tiles: &[Tile],
        range: ElevationRange,
        failures: &[TileFailure],
        out_dir: &Path,
        mut progress: impl FnMut(&TileReport),
    ) -> Result<JobReport, PipelineError> {
        fs::create_dir_all(out_dir).map_err(|e| ExportError::io(out_dir, e))?;

        let mut report = JobReport {
            range,
            ..Default::default()
        };
        for tile in tiles {
            let failed = failures.iter().find(|f| f.index == tile.index());
            let status = match failed {
                Some(failure) => TileStatus::Failed(failure.reason.clone()),
                None => match self.extrude_tile(tile, &range) {
                    Ok(mesh) => {
                        report.files.extend(self.export_tile(tile, &mesh, out_dir)?);
                        TileStatus::Done {
                            volumes: mesh.volumes.len(),
                            triangles: mesh.triangle_count(),
                        }
                    }
                    Err(err) => {
                        log::warn!("Hexagon {} not extruded: {}", tile.index(), err);
                        TileStatus::Failed(err.to_string())
                    }
                },
            };

            let tile_report = TileReport {
                index: tile.index(),
                center: tile.center(),
                status,
            };
            progress(&tile_report);
            report.tiles.push(tile_report);
        }

        report.files.push(self.write_overview(tiles, out_dir)?);
        Ok(report)
    }

    /// Layout, fetch, extrude and export in one go
    pub fn run(&self, out_dir: &Path) -> Result<JobReport, PipelineError> {
        let mut tiles = self.layout()?;
        let (range, failures) = self.fetch_tiles(&mut tiles)?;
        self.export_all(&tiles, range, &failures, out_dir, |_| {})
    }

    fn exporter(&self) -> GeoJsonExporter<'_> {
        if self.params.projected_geojson {
            GeoJsonExporter::projected(&self.projector)
        } else {
            GeoJsonExporter::new(&self.projector)
        }
    }
}
