//! In-memory collaborators for unit tests.

use std::sync::Mutex;

use geo::{LineString, MultiPolygon, Polygon, Rect, coord, polygon};

use crate::api::{ContourSource, LanduseSource, RoadSource};
use crate::domain::{ContourPolygon, NetworkType, RawLanduse, RawRoad};
use crate::error::FetchError;
use crate::geometry::Projector;

pub fn projector() -> Projector {
    Projector::new(coord! { x: 9.95, y: 52.15 }).unwrap()
}

/// Axis-aligned rectangle given in projected meters, returned in geographic
pub fn geographic_rect(
    projector: &Projector,
    (min_x, min_y): (f64, f64),
    (max_x, max_y): (f64, f64),
) -> MultiPolygon<f64> {
    let projected: Polygon<f64> = polygon![
        (x: min_x, y: min_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: max_y),
    ];
    projector
        .multi_polygon_to_geographic(&MultiPolygon::new(vec![projected]))
        .unwrap()
}

/// Polyline given in projected meters, returned in geographic
pub fn geographic_line(projector: &Projector, points: &[(f64, f64)]) -> LineString<f64> {
    points
        .iter()
        .map(|&(x, y)| {
            let (lon, lat) = projector.to_geographic(x, y).unwrap();
            coord! { x: lon, y: lat }
        })
        .collect()
}

/// Returns the same contours for every request and remembers the bboxes
#[derive(Default)]
pub struct FakeContours {
    pub contours: Vec<ContourPolygon>,
    pub fail: bool,
    pub requests: Mutex<Vec<(Rect<f64>, f64)>>,
}

impl FakeContours {
    pub fn new(contours: Vec<ContourPolygon>) -> Self {
        Self {
            contours,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl ContourSource for FakeContours {
    fn contours(&self, bbox: &Rect<f64>, step_m: f64) -> Result<Vec<ContourPolygon>, FetchError> {
        self.requests.lock().unwrap().push((*bbox, step_m));
        if self.fail {
            return Err(FetchError::Tool {
                tool: "gdal_contour".to_string(),
                message: "exit status 1".to_string(),
            });
        }
        Ok(self.contours.clone())
    }
}

#[derive(Default)]
pub struct FakeRoads {
    pub roads: Vec<RawRoad>,
    pub fail: bool,
    pub requests: Mutex<Vec<NetworkType>>,
}

impl FakeRoads {
    pub fn new(roads: Vec<RawRoad>) -> Self {
        Self {
            roads,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl RoadSource for FakeRoads {
    fn fetch_roads(
        &self,
        _area: &Polygon<f64>,
        network: NetworkType,
    ) -> Result<Vec<RawRoad>, FetchError> {
        self.requests.lock().unwrap().push(network);
        if self.fail {
            return Err(FetchError::Status {
                status: 400,
                message: "bad query".to_string(),
            });
        }
        Ok(self.roads.clone())
    }
}

/// Answers every request with the same polygons, tagged with the requested kind
#[derive(Default)]
pub struct FakeLanduse {
    pub polygons: Vec<Polygon<f64>>,
    pub fail: bool,
    pub requests: Mutex<Vec<String>>,
}

impl FakeLanduse {
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        Self {
            polygons,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl LanduseSource for FakeLanduse {
    fn fetch_landuse(
        &self,
        _area: &Polygon<f64>,
        kind: &str,
    ) -> Result<Vec<RawLanduse>, FetchError> {
        self.requests.lock().unwrap().push(kind.to_string());
        if self.fail {
            return Err(FetchError::Status {
                status: 504,
                message: "gateway timeout".to_string(),
            });
        }
        Ok(self
            .polygons
            .iter()
            .map(|polygon| RawLanduse::new(polygon.clone(), kind))
            .collect())
    }
}
