//! Boundaries to the external collaborators and their shipped adapters.

pub mod contours;
pub mod nominatim;
pub mod overpass;

use std::thread;
use std::time::Duration;

use geo::{Polygon, Rect};

use crate::domain::{ContourPolygon, NetworkType, RawLanduse, RawRoad};
use crate::error::FetchError;

pub use contours::GdalContourSource;
pub use nominatim::geocode;
pub use overpass::{OverpassResponse, OverpassSource};

/// Road-graph collaborator
pub trait RoadSource: Send + Sync {
    /// Roads intersecting `area` (geographic). No roads is `Ok(vec![])`.
    fn fetch_roads(&self, area: &Polygon<f64>, network: NetworkType)
    -> Result<Vec<RawRoad>, FetchError>;
}

/// Land-use collaborator
pub trait LanduseSource: Send + Sync {
    /// Closed `landuse=<kind>` areas intersecting `area` (geographic)
    fn fetch_landuse(&self, area: &Polygon<f64>, kind: &str)
    -> Result<Vec<RawLanduse>, FetchError>;
}

/// Elevation raster + contouring collaborator
pub trait ContourSource: Send + Sync {
    /// Banded contour polygons covering `bbox` (geographic) every `step_m` meters
    fn contours(&self, bbox: &Rect<f64>, step_m: f64) -> Result<Vec<ContourPolygon>, FetchError>;
}

/// How often a retryable fetch is attempted, with a linear backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Run `fetch`, retrying retryable failures
    pub fn run<T>(
        &self,
        what: &str,
        mut fetch: impl FnMut() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match fetch() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let wait = self.backoff * attempt;
                    log::warn!(
                        "{} failed ({}), retrying in {:?} (attempt {}/{})",
                        what,
                        err,
                        wait,
                        attempt + 1,
                        attempts
                    );
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
