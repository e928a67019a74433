use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::overpass::DEFAULT_MIRRORS;
use crate::api::{GdalContourSource, OverpassSource, RetryPolicy};
use crate::domain::{DEFAULT_LANDUSE, NetworkType};
use crate::error::FetchError;
use crate::layers::ElevationLayerBuilder;
use crate::mesh::RoadParams;
use crate::pipeline::{GridLayout, JobParams};

fn default_hex_size() -> f64 {
    1000.0
}
fn default_rings() -> u32 {
    1
}
fn default_footprint() -> f64 {
    100.0
}
fn default_base_height() -> f64 {
    3.0
}
fn default_elevation_step() -> f64 {
    10.0
}
fn default_elevation_step_mm() -> f64 {
    0.4
}
fn default_roads() -> bool {
    true
}
fn default_landuse() -> bool {
    true
}
fn default_landuse_type() -> String {
    DEFAULT_LANDUSE.to_string()
}

/// Settings read from a `geotiles.toml`
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileConfig {
    /// Place name to geocode as the grid center
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Hexagon circumradius in meters
    #[serde(default = "default_hex_size")]
    pub hex_size: f64,
    #[serde(default = "default_rings")]
    pub rings: u32,
    /// Cover a square of ± this many meters instead of laying out rings
    #[serde(default)]
    pub cover: Option<f64>,
    #[serde(default = "default_footprint")]
    pub footprint: f64,
    #[serde(default = "default_base_height")]
    pub base_height: f64,
    #[serde(default = "default_elevation_step")]
    pub elevation_step: f64,
    #[serde(default = "default_elevation_step_mm")]
    pub elevation_step_mm: f64,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub network: NetworkType,
    #[serde(default = "default_roads")]
    pub roads: bool,
    #[serde(default)]
    pub simplify: u8,
    /// Export land-use areas next to roads and contours
    #[serde(default = "default_landuse")]
    pub landuse: bool,
    /// `landuse` tag value to fetch
    #[serde(default = "default_landuse_type")]
    pub landuse_type: String,
    #[serde(default)]
    pub split_volumes: bool,
    #[serde(default)]
    pub projected_geojson: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub overpass: OverpassConfig,
    #[serde(default)]
    pub elevation: ElevationConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            query: None,
            lat: None,
            lon: None,
            hex_size: default_hex_size(),
            rings: default_rings(),
            cover: None,
            footprint: default_footprint(),
            base_height: default_base_height(),
            elevation_step: default_elevation_step(),
            elevation_step_mm: default_elevation_step_mm(),
            output: None,
            network: NetworkType::default(),
            roads: default_roads(),
            simplify: 0,
            landuse: default_landuse(),
            landuse_type: default_landuse_type(),
            split_volumes: false,
            projected_geojson: false,
            verbose: false,
            overpass: OverpassConfig::default(),
            elevation: ElevationConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

fn default_overpass_urls() -> Vec<String> {
    DEFAULT_MIRRORS.iter().map(|url| url.to_string()).collect()
}

fn default_overpass_timeout_secs() -> u64 {
    180
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_overpass_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            urls: default_overpass_urls(),
            timeout_secs: default_overpass_timeout_secs(),
        }
    }
}

impl OverpassConfig {
    pub fn source(&self) -> Result<OverpassSource, FetchError> {
        OverpassSource::new(self.urls.clone(), Duration::from_secs(self.timeout_secs))
    }
}

fn default_eio() -> String {
    "eio".to_string()
}
fn default_gdal_contour() -> String {
    "gdal_contour".to_string()
}
fn default_product() -> String {
    "SRTM1".to_string()
}
fn default_margin() -> f64 {
    ElevationLayerBuilder::DEFAULT_MARGIN
}
fn default_elevation_timeout_secs() -> u64 {
    300
}

/// Elevation raster and contouring tools
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ElevationConfig {
    #[serde(default = "default_eio")]
    pub eio: String,
    #[serde(default = "default_gdal_contour")]
    pub gdal_contour: String,
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_elevation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            eio: default_eio(),
            gdal_contour: default_gdal_contour(),
            product: default_product(),
            margin: default_margin(),
            timeout_secs: default_elevation_timeout_secs(),
        }
    }
}

impl ElevationConfig {
    pub fn source(&self) -> GdalContourSource {
        GdalContourSource {
            eio_command: self.eio.clone(),
            gdal_contour_command: self.gdal_contour.clone(),
            product: self.product.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FetchConfig {
    /// Tiles fetched at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Retries after the first attempt of a retryable fetch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Wait before the first retry; later retries wait proportionally longer
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.saturating_add(1),
            backoff: Duration::from_secs(self.backoff_secs),
        }
    }
}

impl FileConfig {
    /// First config file found in the search paths, if any parses
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => {
                        log::debug!("Using config file {}", path.display());
                        return Some(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }
        None
    }

    /// Read an explicitly given config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn layout(&self) -> GridLayout {
        match self.cover {
            Some(half_extent_m) => GridLayout::Cover { half_extent_m },
            None => GridLayout::Rings { radius: self.rings },
        }
    }

    pub fn job_params(&self) -> JobParams {
        JobParams {
            hex_size_m: self.hex_size,
            layout: self.layout(),
            step_m: self.elevation_step,
            step_mm: self.elevation_step_mm,
            footprint_mm: self.footprint,
            base_height_mm: self.base_height,
            margin: self.elevation.margin,
            network: self.network,
            road_ribbons: self.roads,
            road: RoadParams {
                simplify: self.simplify.min(3),
                ..RoadParams::default()
            },
            landuse_kind: self.landuse_type.clone(),
            split_volumes: self.split_volumes,
            projected_geojson: self.projected_geojson,
            max_concurrent: self.fetch.max_concurrent.max(1),
            retry: self.fetch.retry_policy(),
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("geotiles.toml"));
    paths.push(PathBuf::from(".geotiles.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("geotiles").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".geotiles.toml"));
    }

    paths
}
