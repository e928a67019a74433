use std::cmp::Ordering;

use geo::{MultiPolygon, Rect, coord};

use crate::api::{ContourSource, RetryPolicy};
use crate::domain::{ElevationBand, ElevationRange};
use crate::error::TileError;
use crate::geometry::{Bounds, Hexagon, Projector, clip_polygons};

/// Builds the elevation bands of one hexagon
///
/// # Algorithm
/// 1. Hexagon bounding box grown by `margin` → geographic query box(es)
/// 2. Ask the contour source for banded polygons at `step_m`
/// 3. Reproject every contour and clip it against the hexagon outline
/// 4. Fold the elevations of the survivors into the range
pub struct ElevationLayerBuilder<'a> {
    source: &'a dyn ContourSource,
    projector: &'a Projector,
    margin: f64,
    retry: RetryPolicy,
}

impl<'a> ElevationLayerBuilder<'a> {
    pub const DEFAULT_MARGIN: f64 = 0.1;

    pub fn new(source: &'a dyn ContourSource, projector: &'a Projector) -> Self {
        Self {
            source,
            projector,
            margin: Self::DEFAULT_MARGIN,
            retry: RetryPolicy::default(),
        }
    }

    /// Fraction of the hexagon's width/height added on every side of the query box
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Geographic boxes handed to the contour source
    ///
    /// A box reaching across the antimeridian is split into its eastern and
    /// western parts.
    pub fn query_bounds(&self, hexagon: &Hexagon) -> Result<Vec<Rect<f64>>, TileError> {
        let grown = Bounds::from(hexagon.bounding_rect()).with_margin(self.margin);
        let (west, south) = self.projector.to_geographic(grown.min_x, grown.min_y)?;
        let (east, north) = self.projector.to_geographic(grown.max_x, grown.max_y)?;

        let rect = |west: f64, east: f64| {
            Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
        };
        if west <= east {
            Ok(vec![rect(west, east)])
        } else {
            log::debug!("Contour query for hexagon at {:?} split at 180°", hexagon.center());
            Ok(vec![rect(west, 180.0), rect(-180.0, east)])
        }
    }

    /// Bands of `hexagon` sorted by elevation, and `range` widened by them
    pub fn build(
        &self,
        hexagon: &Hexagon,
        step_m: f64,
        mut range: ElevationRange,
    ) -> Result<(Vec<ElevationBand>, ElevationRange), TileError> {
        let mut contours = Vec::new();
        for bbox in self.query_bounds(hexagon)? {
            contours.extend(
                self.retry
                    .run("elevation contours", || self.source.contours(&bbox, step_m))?,
            );
        }
        if contours.is_empty() {
            log::info!("No contours around hexagon at {:?}", hexagon.center());
            return Ok((Vec::new(), range));
        }

        let outline = hexagon.polygon();
        let mut bands = Vec::new();
        for contour in contours {
            let elevation = contour.elevation_min;
            if !elevation.is_finite() {
                log::warn!("Skipping contour with elevation {}", elevation);
                continue;
            }

            let projected = match self.projector.multi_polygon_to_projected(&contour.polygon) {
                Ok(projected) => projected,
                Err(err) => {
                    log::warn!("Skipping {} m contour: {}", elevation, err);
                    continue;
                }
            };
            let polygon: MultiPolygon<f64> = match clip_polygons(&projected, &outline) {
                Ok(clipped) => clipped,
                Err(err) => {
                    log::warn!("Skipping {} m contour: {}", elevation, err);
                    continue;
                }
            };
            if polygon.0.is_empty() {
                log::debug!("{} m contour lies outside the hexagon", elevation);
                continue;
            }

            log::debug!("{} m band with {} polygons", elevation, polygon.0.len());
            range.include(elevation);
            bands.push(ElevationBand::new(polygon, elevation, self.projector.crs()));
        }

        bands.sort_by(|a, b| {
            a.elevation
                .partial_cmp(&b.elevation)
                .unwrap_or(Ordering::Equal)
        });
        Ok((bands, range))
    }
}
