use geo::MultiPolygon;

use crate::geometry::Crs;

/// Contour polygon as produced by the contouring collaborator (geographic)
#[derive(Debug, Clone, PartialEq)]
pub struct ContourPolygon {
    pub polygon: MultiPolygon<f64>,
    /// Lower contour level of the band, in meters
    pub elevation_min: f64,
    /// Upper contour level, when the tool reports it
    pub elevation_max: Option<f64>,
}

/// A region of roughly constant elevation, clipped to one hexagon
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationBand {
    pub polygon: MultiPolygon<f64>,
    /// Meters; the band's lower contour level
    pub elevation: f64,
    pub crs: Crs,
}

impl ElevationBand {
    pub fn new(polygon: MultiPolygon<f64>, elevation: f64, crs: Crs) -> Self {
        Self {
            polygon,
            elevation,
            crs,
        }
    }
}

/// Running min/max of band elevations across a job
///
/// Starts empty. Partial ranges computed per hexagon are combined with
/// [`ElevationRange::merge`], so fetches can run in any order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ElevationRange {
    fn default() -> Self {
        Self::empty()
    }
}

impl ElevationRange {
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(self, other: ElevationRange) -> ElevationRange {
        ElevationRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// `max - min`, or 0 for an empty range
    pub fn span(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max - self.min
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl FromIterator<f64> for ElevationRange {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut range = ElevationRange::empty();
        for value in iter {
            range.include(value);
        }
        range
    }
}
