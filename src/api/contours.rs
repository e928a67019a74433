//! Elevation contours from an SRTM clip run through `gdal_contour`.
//!
//! Both tools run as subprocesses inside a temporary directory. Their stderr
//! goes to a log file in that directory so a chatty tool can never block on a
//! full pipe; on failure the tail of the log becomes the error message.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
use serde::Deserialize;
use serde_json::Value;

use super::ContourSource;
use crate::domain::ContourPolygon;
use crate::error::FetchError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// `ContourSource` backed by the `eio` and `gdal_contour` command-line tools
#[derive(Debug, Clone)]
pub struct GdalContourSource {
    pub eio_command: String,
    pub gdal_contour_command: String,
    /// elevation.io product, e.g. `SRTM1` (30 m) or `SRTM3` (90 m)
    pub product: String,
    /// Deadline for each subprocess
    pub timeout: Duration,
}

impl Default for GdalContourSource {
    fn default() -> Self {
        Self {
            eio_command: "eio".to_string(),
            gdal_contour_command: "gdal_contour".to_string(),
            product: "SRTM1".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl ContourSource for GdalContourSource {
    fn contours(&self, bbox: &Rect<f64>, step_m: f64) -> Result<Vec<ContourPolygon>, FetchError> {
        let workdir = tempfile::tempdir()?;
        let dem = workdir.path().join("dem.tif");
        let output = workdir.path().join("contours.geojson");

        log::debug!(
            "clipping {} raster for ({:.5}, {:.5}, {:.5}, {:.5})",
            self.product,
            bbox.min().x,
            bbox.min().y,
            bbox.max().x,
            bbox.max().y
        );
        run_tool(
            &self.eio_command,
            clip_args(&self.product, bbox, &dem),
            workdir.path(),
            self.timeout,
        )?;
        run_tool(
            &self.gdal_contour_command,
            contour_args(step_m, &dem, &output),
            workdir.path(),
            self.timeout,
        )?;

        let text = std::fs::read_to_string(&output)?;
        parse_contours(&text)
    }
}

fn clip_args(product: &str, bbox: &Rect<f64>, dem: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--product".into(),
        product.into(),
        "clip".into(),
        "-o".into(),
        dem.into(),
        "--bounds".into(),
    ];
    for value in [bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y] {
        args.push(value.to_string().into());
    }
    args
}

fn contour_args(step_m: f64, dem: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        step_m.to_string().into(),
        "-amin".into(),
        "elevation_min".into(),
        "-amax".into(),
        "elevation_max".into(),
        "-p".into(),
        "-q".into(),
        "-f".into(),
        "GeoJSON".into(),
        dem.into(),
        output.into(),
    ]
}

/// Run `program` to completion, killing it once `timeout` has passed
fn run_tool(
    program: &str,
    args: Vec<OsString>,
    workdir: &Path,
    timeout: Duration,
) -> Result<(), FetchError> {
    let log_path = workdir.join(format!("{}.log", tool_name(program)));
    let log_file = File::create(&log_path)?;

    let mut child = Command::new(program)
        .args(&args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(log_file))
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::Tool {
                tool: program.to_string(),
                message: "command not found".to_string(),
            },
            _ => FetchError::Io(e),
        })?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            // Already exited between try_wait and kill is fine
            let _ = child.kill();
            let _ = child.wait();
            return Err(FetchError::Timeout(format!(
                "{} did not finish within {:?}",
                program, timeout
            )));
        }
        thread::sleep(POLL_INTERVAL);
    };

    if status.success() {
        return Ok(());
    }

    let log = std::fs::read_to_string(&log_path).unwrap_or_default();
    let tail: Vec<&str> = log.lines().rev().take(5).collect();
    let mut message = status.to_string();
    if !tail.is_empty() {
        message.push_str(": ");
        message.push_str(&tail.into_iter().rev().collect::<Vec<_>>().join(" | "));
    }
    Err(FetchError::Tool {
        tool: program.to_string(),
        message,
    })
}

fn tool_name(program: &str) -> String {
    Path::new(program)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tool".to_string())
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    type_: String,
    coordinates: Value,
}

/// Parse `gdal_contour -p` GeoJSON output
///
/// Polygon and MultiPolygon features become contours; other geometry types
/// and features without a usable `elevation_min` are skipped.
pub fn parse_contours(text: &str) -> Result<Vec<ContourPolygon>, FetchError> {
    let collection: FeatureCollection = serde_json::from_str(text)
        .map_err(|e| FetchError::InvalidResponse(format!("contour GeoJSON: {}", e)))?;

    let mut contours = Vec::new();
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let Some(elevation_min) = number_property(&feature.properties, "elevation_min") else {
            log::warn!("skipping contour without elevation_min");
            continue;
        };
        let elevation_max = number_property(&feature.properties, "elevation_max");

        let polygon = match geometry.type_.as_str() {
            "Polygon" => MultiPolygon::new(vec![to_polygon(geometry.coordinates)?]),
            "MultiPolygon" => {
                let parts: Vec<Value> = from_value(geometry.coordinates)?;
                MultiPolygon::new(
                    parts
                        .into_iter()
                        .map(to_polygon)
                        .collect::<Result<_, _>>()?,
                )
            }
            other => {
                log::debug!("skipping {} contour feature", other);
                continue;
            }
        };

        contours.push(ContourPolygon {
            polygon,
            elevation_min,
            elevation_max,
        });
    }

    Ok(contours)
}

/// Numeric attribute; GDAL writes strings for some drivers
fn number_property(properties: &HashMap<String, Value>, key: &str) -> Option<f64> {
    let value = match properties.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite())
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value)
        .map_err(|e| FetchError::InvalidResponse(format!("contour coordinates: {}", e)))
}

fn to_polygon(coordinates: Value) -> Result<Polygon<f64>, FetchError> {
    let rings: Vec<Vec<Vec<f64>>> = from_value(coordinates)?;
    let mut rings = rings.into_iter().map(to_ring);

    let exterior = rings
        .next()
        .ok_or_else(|| FetchError::InvalidResponse("polygon without rings".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(positions: Vec<Vec<f64>>) -> Result<LineString<f64>, FetchError> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(FetchError::InvalidResponse(format!(
                "position with {} values",
                p.len()
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ID": 0, "elevation_min": 100.0, "elevation_max": 110.0},
                "geometry": {"type": "Polygon", "coordinates": [
                    [[9.9, 52.1], [10.0, 52.1], [10.0, 52.2], [9.9, 52.1]],
                    [[9.95, 52.12], [9.97, 52.12], [9.97, 52.14], [9.95, 52.12]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"elevation_min": "110"},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[9.9, 52.1, 0.0], [9.91, 52.1, 0.0], [9.91, 52.11, 0.0], [9.9, 52.1, 0.0]]],
                    [[[9.8, 52.0], [9.81, 52.0], [9.81, 52.01], [9.8, 52.0]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"elevation_min": 120.0},
                "geometry": {"type": "LineString", "coordinates": [[9.9, 52.1], [10.0, 52.2]]}
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Polygon", "coordinates": [
                    [[9.9, 52.1], [10.0, 52.1], [10.0, 52.2], [9.9, 52.1]]
                ]}
            },
            {"type": "Feature", "properties": {"elevation_min": 130.0}, "geometry": null}
        ]
    }"#;

    #[test]
    fn test_parse_contours() {
        let contours = parse_contours(SAMPLE).unwrap();
        assert_eq!(contours.len(), 2);

        assert_eq!(contours[0].elevation_min, 100.0);
        assert_eq!(contours[0].elevation_max, Some(110.0));
        assert_eq!(contours[0].polygon.0.len(), 1);
        assert_eq!(contours[0].polygon.0[0].interiors().len(), 1);
        assert_eq!(
            contours[0].polygon.0[0].exterior().0[1],
            coord! { x: 10.0, y: 52.1 }
        );

        assert_eq!(contours[1].elevation_min, 110.0);
        assert_eq!(contours[1].elevation_max, None);
        assert_eq!(contours[1].polygon.0.len(), 2);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_contours("not json"),
            Err(FetchError::InvalidResponse(_))
        ));

        let short_position = r#"{"features": [{"properties": {"elevation_min": 1},
            "geometry": {"type": "Polygon", "coordinates": [[[9.9]]]}}]}"#;
        assert!(matches!(
            parse_contours(short_position),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_tool_arguments() {
        let bbox = Rect::new(coord! { x: 9.9, y: 52.1 }, coord! { x: 10.0, y: 52.2 });
        let args = clip_args("SRTM1", &bbox, Path::new("dem.tif"));
        assert_eq!(
            args,
            ["--product", "SRTM1", "clip", "-o", "dem.tif", "--bounds", "9.9", "52.1", "10", "52.2"]
                .map(OsString::from)
        );

        let args = contour_args(10.0, Path::new("dem.tif"), Path::new("out.geojson"));
        assert_eq!(args[0], "-i");
        assert_eq!(args[1], "10");
        assert!(args.contains(&OsString::from("-p")));
        assert_eq!(args.last().unwrap(), "out.geojson");
    }

    #[test]
    fn test_missing_tool() {
        let source = GdalContourSource {
            eio_command: "geotiles-no-such-eio".to_string(),
            ..Default::default()
        };
        let bbox = Rect::new(coord! { x: 9.9, y: 52.1 }, coord! { x: 10.0, y: 52.2 });

        let err = source.contours(&bbox, 10.0).unwrap_err();
        assert!(matches!(err, FetchError::Tool { .. }), "{err}");
        assert!(!err.is_retryable());
    }
}
