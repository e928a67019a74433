//! Error types shared by the tiling pipeline.
//!
//! Empty layers are not errors: a hexagon without roads or contours yields an
//! empty `Vec` and a log line.

use thiserror::Error;

use crate::geometry::Crs;

/// Coordinate outside the projection's valid domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("coordinate (lon {lon}, lat {lat}) is outside the projection domain")]
    OutOfDomain { lon: f64, lat: f64 },

    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}

/// Failure of an external collaborator (road graph, elevation raster, contouring).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("external tool `{tool}` failed: {message}")]
    Tool { tool: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Whether trying the same request again can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Unreachable(_) => true,
            FetchError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            FetchError::InvalidResponse(_) | FetchError::Tool { .. } | FetchError::Io(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            FetchError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::InvalidResponse(err.to_string())
        }
    }
}

/// A clip or intersection produced (or was fed) unusable geometry.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid geometry in {context}: {reason}")]
pub struct GeometryError {
    pub context: String,
    pub reason: String,
}

impl GeometryError {
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// A layer reached a stage in the wrong reference frame.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{layer} is in {found}, expected {expected}")]
pub struct CrsMismatchError {
    pub layer: String,
    pub expected: Crs,
    pub found: Crs,
}

impl CrsMismatchError {
    /// Fails unless `found` equals `expected`
    pub fn check(layer: &str, expected: Crs, found: Crs) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self {
                layer: layer.to_string(),
                expected,
                found,
            })
        }
    }
}

/// Invalid grid layout parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("hexagon size must be positive and finite, got {0}")]
    InvalidSize(f64),

    #[error("bounding box ({left}, {bottom}, {right}, {top}) is inverted or not finite")]
    InvalidBounds {
        left: f64,
        bottom: f64,
        right: f64,
        top: f64,
    },
}

/// Everything that can fail one hexagon.
#[derive(Debug, Error)]
pub enum TileError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    CrsMismatch(#[from] CrsMismatchError),

    #[error("tile layers accessed before fetch()")]
    NotFetched,
}

/// Writing an output file failed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    CrsMismatch(#[from] CrsMismatchError),
}

impl ExportError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Failures that stop a whole job.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("failed to start fetch workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}
