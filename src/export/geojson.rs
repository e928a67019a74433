//! Vector export of tiles and grid overviews as GeoJSON FeatureCollections.
//!
//! Features carry simplestyle properties (`stroke`, `stroke-width`,
//! `fill-opacity`) so the files render directly in geojson.io and most GIS
//! viewers.

use std::fs;
use std::path::Path;

use geo::{BoundingRect, Coord, LineString, MultiLineString, MultiPolygon, Polygon, Rect};
use serde_json::{Value, json};

use crate::domain::{ElevationBand, LanduseArea, RoadSegment};
use crate::error::{CrsMismatchError, ExportError, ProjectionError};
use crate::geometry::{Crs, Hexagon, Projector};

const OUTLINE_STROKE: &str = "#0000ff";
const CONTOUR_STROKE: &str = "#00ff00";
const ROAD_STROKE: &str = "#ff0000";
const LANDUSE_STROKE: &str = "#ff0000";
const BOUNDS_STROKE: &str = "#000000";

/// Features collected for one output file
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    features: Vec<Value>,
    /// Named frame for non-geographic output
    crs: Option<String>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, geometry: Value, properties: Value) {
        self.features.push(json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": properties,
        }));
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "type": "FeatureCollection",
            "features": self.features,
        });
        if let Some(name) = &self.crs {
            value["crs"] = json!({ "type": "name", "properties": { "name": name } });
        }
        value
    }

    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let text = serde_json::to_string_pretty(&self.to_value())?;
        fs::write(path, text).map_err(|e| ExportError::io(path, e))
    }
}

/// Turns projected layers into GeoJSON in a chosen output frame
pub struct GeoJsonExporter<'a> {
    projector: &'a Projector,
    output: Crs,
}

impl<'a> GeoJsonExporter<'a> {
    /// Exports reprojected to WGS84 lon/lat
    pub fn new(projector: &'a Projector) -> Self {
        Self {
            projector,
            output: Crs::Geographic,
        }
    }

    /// Exports in the projector's local meters
    pub fn projected(projector: &'a Projector) -> Self {
        Self {
            projector,
            output: projector.crs(),
        }
    }

    pub fn output(&self) -> Crs {
        self.output
    }

    /// Hexagon outline, elevation bands, roads and land use of one tile
    pub fn tile(
        &self,
        index: usize,
        hexagon: &Hexagon,
        bands: &[ElevationBand],
        roads: &[RoadSegment],
        landuse: &[LanduseArea],
    ) -> Result<FeatureCollection, ExportError> {
        let frame = self.projector.crs();
        let mut collection = self.collection();

        collection.push(
            self.outline(hexagon)?,
            json!({
                "layer": "hexagon",
                "index": index,
                "stroke": OUTLINE_STROKE,
                "stroke-width": 2,
            }),
        );

        for band in bands {
            CrsMismatchError::check("elevation band", frame, band.crs)?;
            let polygon = self.multi_polygon(&band.polygon)?;
            collection.push(
                multi_polygon_geometry(&polygon),
                json!({
                    "layer": "elevation",
                    "elevation": band.elevation,
                    "stroke": CONTOUR_STROKE,
                    "stroke-width": 1,
                    "fill-opacity": 0,
                }),
            );
        }

        for road in roads {
            CrsMismatchError::check("road segment", frame, road.crs)?;
            let lines = self.lines(&road.geometry)?;
            collection.push(
                multi_line_geometry(&lines),
                json!({
                    "layer": "road",
                    "lanes": road.lanes,
                    "elevation": road.elevation,
                    "stroke": ROAD_STROKE,
                    "stroke-width": road.lanes.max(1),
                }),
            );
        }

        for area in landuse {
            CrsMismatchError::check("land-use area", frame, area.crs)?;
            let polygon = self.multi_polygon(&area.polygon)?;
            collection.push(
                multi_polygon_geometry(&polygon),
                json!({
                    "layer": "landuse",
                    "type": area.kind,
                    "stroke": LANDUSE_STROKE,
                    "stroke-width": 1,
                    "fill-opacity": 0,
                }),
            );
        }

        Ok(collection)
    }

    /// Every hexagon outline of a job, for checking the layout on a map
    ///
    /// The first feature is the box around all hexagons. Hexagons that cannot
    /// be expressed in the output frame are left out.
    pub fn grid(&self, hexagons: &[Hexagon]) -> Result<FeatureCollection, ExportError> {
        let mut collection = self.collection();

        let extent = hexagons
            .iter()
            .map(Hexagon::bounding_rect)
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            });
        if let Some(extent) = extent {
            match self.polygon(&extent.to_polygon()) {
                Ok(bounds) => {
                    let bbox = bounds
                        .bounding_rect()
                        .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]);
                    collection.push(
                        json!({
                            "type": "Polygon",
                            "coordinates": polygon_coordinates(&bounds),
                        }),
                        json!({
                            "layer": "bounds",
                            "bbox": bbox,
                            "stroke": BOUNDS_STROKE,
                            "stroke-width": 2,
                            "fill-opacity": 0,
                        }),
                    );
                }
                Err(err) => log::warn!("Leaving the grid bounds out of the overview: {}", err),
            }
        }

        for (index, hexagon) in hexagons.iter().enumerate() {
            let (center, outline) = match self.point(hexagon.center()).and_then(|center| {
                self.outline(hexagon).map(|outline| (center, outline))
            }) {
                Ok(projected) => projected,
                Err(err) => {
                    log::warn!("Leaving hexagon {} out of the overview: {}", index, err);
                    continue;
                }
            };
            collection.push(
                outline,
                json!({
                    "layer": "hexagon",
                    "index": index,
                    "name": tile_stem(index),
                    "center": [center.x, center.y],
                    "stroke": OUTLINE_STROKE,
                    "stroke-width": 1,
                }),
            );
        }
        Ok(collection)
    }

    fn collection(&self) -> FeatureCollection {
        FeatureCollection {
            features: Vec::new(),
            crs: match self.output {
                Crs::Geographic => None,
                projected => Some(projected.to_string()),
            },
        }
    }

    fn outline(&self, hexagon: &Hexagon) -> Result<Value, ProjectionError> {
        let polygon = self.polygon(&hexagon.polygon())?;
        Ok(json!({
            "type": "LineString",
            "coordinates": line_coordinates(polygon.exterior()),
        }))
    }

    fn point(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        match self.output {
            Crs::Geographic => {
                let (x, y) = self.projector.to_geographic(c.x, c.y)?;
                Ok(Coord { x, y })
            }
            Crs::Projected { .. } => Ok(c),
        }
    }

    fn polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, ProjectionError> {
        match self.output {
            Crs::Geographic => self.projector.polygon_to_geographic(polygon),
            Crs::Projected { .. } => Ok(polygon.clone()),
        }
    }

    fn multi_polygon(
        &self,
        polygon: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, ProjectionError> {
        match self.output {
            Crs::Geographic => self.projector.multi_polygon_to_geographic(polygon),
            Crs::Projected { .. } => Ok(polygon.clone()),
        }
    }

    fn lines(&self, lines: &MultiLineString<f64>) -> Result<MultiLineString<f64>, ProjectionError> {
        match self.output {
            Crs::Geographic => self.projector.lines_to_geographic(lines),
            Crs::Projected { .. } => Ok(lines.clone()),
        }
    }
}

/// File stem shared by every output of tile `index`
pub fn tile_stem(index: usize) -> String {
    format!("hex_{:03}", index)
}

fn line_coordinates(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Value {
    let rings = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_coordinates)
        .collect();
    Value::Array(rings)
}

fn multi_polygon_geometry(polygon: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = polygon.iter().map(polygon_coordinates).collect();
    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

fn multi_line_geometry(lines: &MultiLineString<f64>) -> Value {
    let lines: Vec<Value> = lines.iter().map(line_coordinates).collect();
    json!({ "type": "MultiLineString", "coordinates": lines })
}
