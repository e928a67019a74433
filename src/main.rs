use anyhow::{Context, Result, bail};
use clap::Parser;
use geo::coord;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use geotiles::config::FileConfig;
use geotiles::domain::{ElevationRange, NetworkType};
use geotiles::geometry::Projector;
use geotiles::mesh::terrain::{BASE_COLOR, ROAD_COLOR, hypsometric_color};
use geotiles::mesh::{ExtrusionParams, estimate_stl_size};
use geotiles::pipeline::{JobReport, Pipeline, TileStatus};

/// Generate 3D-printable hexagonal terrain tiles from elevation and OpenStreetMap data
///
/// Examples:
///   # Center hexagon and one ring around Göttingen
///   geotiles "Göttingen, Germany"
///
///   # Two rings of 650 m hexagons, 5 m contours
///   geotiles "Brocken, Germany" -s 650 -r 2 -e 5 -o brocken
///
///   # Cover a 4 km square using coordinates, one STL per color
///   geotiles --lat 47.42 --lon 10.98 --cover 2000 --split-volumes
///
///   # Use a config file
///   geotiles --config my-settings.toml
#[derive(Parser, Debug)]
#[command(name = "geotiles")]
#[command(version, about, long_about = None)]
struct Args {
    /// Place to center the grid on (optional if --lat and --lon are provided)
    query: Option<String>,

    /// Path to config file (optional, auto-searches geotiles.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Latitude of the grid center (use with --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the grid center (use with --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Output directory (defaults to a name derived from the query)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Hexagon circumradius in meters [default: 1000]
    #[arg(short = 's', long)]
    hex_size: Option<f64>,

    /// Number of hexagon rings around the center [default: 1]
    #[arg(short = 'r', long, conflicts_with = "cover")]
    rings: Option<u32>,

    /// Cover a square of ± this many meters instead of laying out rings
    #[arg(long)]
    cover: Option<f64>,

    /// Printed size of each tile's longer side in mm [default: 100]
    #[arg(long)]
    footprint: Option<f64>,

    /// Base slab thickness in mm [default: 3]
    #[arg(long)]
    base_height: Option<f64>,

    /// Contour interval in meters [default: 10]
    #[arg(short = 'e', long)]
    elevation_step: Option<f64>,

    /// Printed height of one contour interval in mm [default: 0.4]
    #[arg(long)]
    elevation_step_mm: Option<f64>,

    /// Road network to fetch [default: drive]
    #[arg(long)]
    network: Option<NetworkType>,

    /// Leave road ribbons out of the meshes (roads still go into the GeoJSON)
    #[arg(long)]
    no_roads: bool,

    /// Leave land-use areas out of the GeoJSON
    #[arg(long)]
    no_landuse: bool,

    /// Land-use tag value to export [default: residential]
    #[arg(long, conflicts_with = "no_landuse")]
    landuse_type: Option<String>,

    /// Road simplification level: 0=off (default), 1=light, 2=medium, 3=aggressive
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    simplify: Option<u8>,

    /// Also write one STL per volume for multi-material slicers
    #[arg(long)]
    split_volumes: bool,

    /// Write GeoJSON in local meters instead of lon/lat
    #[arg(long)]
    projected_geojson: bool,

    /// Hexagons fetched at the same time [default: 4]
    #[arg(short = 'j', long)]
    max_concurrent: Option<usize>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    /// Command-line values win over the config file
    fn apply(&self, config: &mut FileConfig) {
        if let Some(query) = &self.query {
            config.query = Some(query.clone());
        }
        if self.lat.is_some() {
            config.lat = self.lat;
            config.lon = self.lon;
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(hex_size) = self.hex_size {
            config.hex_size = hex_size;
        }
        if let Some(rings) = self.rings {
            config.rings = rings;
            config.cover = None;
        }
        if self.cover.is_some() {
            config.cover = self.cover;
        }
        if let Some(footprint) = self.footprint {
            config.footprint = footprint;
        }
        if let Some(base_height) = self.base_height {
            config.base_height = base_height;
        }
        if let Some(step) = self.elevation_step {
            config.elevation_step = step;
        }
        if let Some(step_mm) = self.elevation_step_mm {
            config.elevation_step_mm = step_mm;
        }
        if let Some(network) = self.network {
            config.network = network;
        }
        if self.no_roads {
            config.roads = false;
        }
        if self.no_landuse {
            config.landuse = false;
        }
        if let Some(kind) = &self.landuse_type {
            config.landuse_type = kind.clone();
        }
        if let Some(simplify) = self.simplify {
            config.simplify = simplify;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.fetch.max_concurrent = max_concurrent;
        }
        config.split_volumes |= self.split_volumes;
        config.projected_geojson |= self.projected_geojson;
        config.verbose |= self.verbose;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    // Crate debug output is gated by the global max level, set once the
    // config file has been read
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("geotiles", LevelFilter::Debug)
        .parse_default_env()
        .init();
    log::set_max_level(level(args.verbose));

    let mut config = if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            bail!("Config file not found: {:?}", config_path);
        }
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::load().unwrap_or_default()
    };
    args.apply(&mut config);
    log::set_max_level(level(config.verbose));

    if config.query.is_none() && config.lat.is_none() {
        bail!("Must provide either a place query or --lat and --lon");
    }
    if config.elevation_step <= 0.0 {
        bail!("--elevation-step must be positive");
    }

    println!("geotiles - Hexagonal Terrain Tile Generator");
    println!("===========================================");
    println!();

    let output_dir = config.output.clone().unwrap_or_else(|| match &config.query {
        Some(query) => PathBuf::from(slug(query)),
        None => PathBuf::from("tiles"),
    });
    let params = config.job_params();

    if config.verbose {
        println!("Configuration:");
        if let Some(ref query) = config.query {
            println!("  Query: {}", query);
        }
        if let (Some(lat), Some(lon)) = (config.lat, config.lon) {
            println!("  Coordinates: ({:.4}, {:.4})", lat, lon);
        }
        println!("  Hexagon size: {}m", params.hex_size_m);
        println!("  Layout: {:?}", params.layout);
        println!("  Footprint: {}mm", params.footprint_mm);
        println!("  Base height: {}mm", params.base_height_mm);
        println!(
            "  Elevation step: {}m -> {}mm",
            params.step_m, params.step_mm
        );
        println!("  Network: {:?}", params.network);
        println!(
            "  Road ribbons: {}",
            if params.road_ribbons { "enabled" } else { "disabled" }
        );
        println!("  Simplify level: {}", params.road.simplify);
        println!(
            "  Land use: {}",
            if config.landuse { params.landuse_kind.as_str() } else { "disabled" }
        );
        println!("  Elevation product: {}", config.elevation.product);
        println!("  Overpass mirrors: {}", config.overpass.urls.len());
        println!("  Concurrent fetches: {}", params.max_concurrent);
        println!("  Output: {}", output_dir.display());
        println!();
    }

    let (lon, lat) = if let (Some(lat), Some(lon)) = (config.lat, config.lon) {
        println!("Using provided coordinates: ({:.4}, {:.4})", lat, lon);
        (lon, lat)
    } else {
        let query = config.query.as_deref().unwrap_or_default();
        let spinner = create_spinner("Geocoding center...");
        let start = Instant::now();
        let (lon, lat) = geotiles::api::geocode(query).context("Failed to geocode center")?;
        spinner.finish_with_message(format!(
            "Geocoded: {} -> ({:.4}, {:.4}) [{:.1}s]",
            query,
            lat,
            lon,
            start.elapsed().as_secs_f32()
        ));
        (lon, lat)
    };

    let projector =
        Projector::new(coord! { x: lon, y: lat }).context("Center is outside the supported area")?;
    let overpass = config
        .overpass
        .source()
        .context("Failed to set up the Overpass client")?;
    let contours = config.elevation.source();
    let mut pipeline = Pipeline::new(params, projector, &contours, &overpass);
    if config.landuse {
        pipeline = pipeline.with_landuse(&overpass);
    }

    let mut tiles = pipeline.layout().context("Invalid grid layout")?;
    println!("Laid out {} hexagons", tiles.len());

    let spinner = create_spinner(&format!(
        "Fetching contours, roads and land use for {} hexagons...",
        tiles.len()
    ));
    let start = Instant::now();
    let (range, failures) = pipeline
        .fetch_tiles(&mut tiles)
        .context("Failed to fetch tile data")?;
    spinner.finish_with_message(format!(
        "Fetched {} hexagons, {} failed, elevation {} [{:.1}s]",
        tiles.len() - failures.len(),
        failures.len(),
        describe_range(&range),
        start.elapsed().as_secs_f32()
    ));

    let progress = ProgressBar::new(tiles.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    progress.set_message("Extruding and writing tiles...");
    let start = Instant::now();
    let report = pipeline
        .export_all(&tiles, range, &failures, &output_dir, |tile| {
            progress.set_message(format!("hex_{:03}", tile.index));
            progress.inc(1);
        })
        .context("Failed to write tiles")?;
    progress.finish_with_message(format!(
        "Wrote {} files [{:.1}s]",
        report.files.len(),
        start.elapsed().as_secs_f32()
    ));

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );
    println!();
    print_summary(&report);
    println!();
    println!("Output: {}", output_dir.display());
    println!();
    print_color_change_guide(
        &pipeline.extrusion_params(&report.range),
        &report.range,
        pipeline.params().step_m,
        pipeline.params().road_ribbons,
    );

    Ok(())
}

fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn slug(query: &str) -> String {
    let slug: String = query
        .split(',')
        .next()
        .unwrap_or(query)
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "tiles".to_string()
    } else {
        slug
    }
}

fn describe_range(range: &ElevationRange) -> String {
    if range.is_empty() {
        "unknown".to_string()
    } else {
        format!("{:.0}-{:.0}m", range.min, range.max)
    }
}

fn print_summary(report: &JobReport) {
    println!("Tiles ({} done, {} failed):", report.done(), report.failed());
    let mut total_triangles = 0;
    for tile in &report.tiles {
        match &tile.status {
            TileStatus::Done { volumes, triangles } => {
                total_triangles += triangles;
                println!(
                    "  hex_{:03} ({:>7.0}, {:>7.0}): {} volumes, {} triangles ({:.1} KB)",
                    tile.index,
                    tile.center.x,
                    tile.center.y,
                    volumes,
                    triangles,
                    estimate_stl_size(*triangles) as f64 / 1024.0
                );
            }
            TileStatus::Failed(reason) => {
                println!(
                    "  hex_{:03} ({:>7.0}, {:>7.0}): FAILED - {}",
                    tile.index, tile.center.x, tile.center.y, reason
                );
            }
        }
    }
    println!("Total: {} triangles", total_triangles);
}

fn print_color_change_guide(
    params: &ExtrusionParams,
    range: &ElevationRange,
    step_m: f64,
    road_ribbons: bool,
) {
    const LAYER_HEIGHT: f64 = 0.2;
    let layers = |z: f64| (z / LAYER_HEIGHT).round() as i64;

    let base_layers = layers(params.base_height_mm);

    println!("Multi-Color FDM Printing Guide (0.2mm layer height)");
    println!("====================================================");
    println!();
    println!("Every tile shares one vertical scale, so one schedule fits all of them.");
    println!();
    println!("Color change schedule:");
    println!(
        "  Layers 1-{}: Base slab (Color 1, {})",
        base_layers, BASE_COLOR
    );

    if range.is_empty() || range.span() <= 0.0 {
        println!("  No elevation bands above the base: a single color is enough.");
    } else {
        let mut color_num = 2;
        let mut prev_layers = base_layers;
        let mut elevation = range.min + step_m;
        while elevation <= range.max + step_m * 1e-6 {
            let top = params.base_height_mm + params.band_height_mm(elevation);
            let top_layers = layers(top);
            if top_layers > prev_layers {
                println!(
                    "  Layers {}-{}: band up to {:.0}m tops out at {:.1}mm (Color {}, {})",
                    prev_layers + 1,
                    top_layers,
                    elevation,
                    top,
                    color_num,
                    hypsometric_color(
                        elevation - params.elevation_offset_m,
                        params.color_span_m
                    )
                );
                color_num += 1;
                prev_layers = top_layers;
            }
            elevation += step_m;
        }
    }

    println!();
    if road_ribbons {
        println!(
            "Roads ({}) stand on the band below them and cut through several layers.",
            ROAD_COLOR
        );
        println!("For clean roads, print with --split-volumes in a multi-material slicer");
        println!("(PrusaSlicer, OrcaSlicer) and assign the roads volume its own filament.");
    } else {
        println!("For clean color separation, print with --split-volumes in a");
        println!("multi-material slicer and assign one filament per band volume.");
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
