use geo::{MultiLineString, MultiPolygon};

use crate::api::{RetryPolicy, RoadSource};
use crate::domain::{ElevationBand, NetworkType, RoadSegment, parse_lanes};
use crate::error::{CrsMismatchError, TileError};
use crate::geometry::{Hexagon, Projector, clip_lines};
use crate::layers::query_areas;

/// Builds the road segments of one hexagon
pub struct RoadLayerBuilder<'a> {
    source: &'a dyn RoadSource,
    projector: &'a Projector,
    network: NetworkType,
    retry: RetryPolicy,
}

impl<'a> RoadLayerBuilder<'a> {
    pub fn new(source: &'a dyn RoadSource, projector: &'a Projector) -> Self {
        Self {
            source,
            projector,
            network: NetworkType::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_network(mut self, network: NetworkType) -> Self {
        self.network = network;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Roads inside `hexagon`, in the projected frame, lanes normalized
    ///
    /// No roads is an empty `Vec`, not an error.
    pub fn build(&self, hexagon: &Hexagon) -> Result<Vec<RoadSegment>, TileError> {
        let mut segments = Vec::new();
        for (area, mask) in query_areas(self.projector, hexagon)? {
            let raw = self
                .retry
                .run("road graph", || self.source.fetch_roads(&area, self.network))?;

            let mask = MultiPolygon::new(vec![mask]);
            for road in raw {
                let line = self.projector.line_to_projected(&road.line)?;
                let lanes = parse_lanes(road.lanes.as_deref());

                match clip_lines(&MultiLineString::new(vec![line]), &mask) {
                    Ok(clipped) if clipped.0.is_empty() => {}
                    Ok(clipped) => {
                        segments.push(RoadSegment::new(clipped, lanes, self.projector.crs()))
                    }
                    Err(err) => log::warn!("Skipping road: {}", err),
                }
            }
        }

        if segments.is_empty() {
            log::info!("No roads in hexagon at {:?}", hexagon.center());
        } else {
            log::debug!(
                "{} road segments in hexagon at {:?}",
                segments.len(),
                hexagon.center()
            );
        }
        Ok(segments)
    }
}

/// Split road segments along elevation bands
///
/// Every band/segment pair with a non-empty intersection yields one segment
/// carrying the band's elevation and the original lane count, in band order.
/// Pairs whose clip fails are skipped with a warning.
pub fn overlay(
    segments: &[RoadSegment],
    bands: &[ElevationBand],
) -> Result<Vec<RoadSegment>, CrsMismatchError> {
    if let Some(band) = bands.first() {
        for band_crs in bands.iter().map(|b| b.crs) {
            CrsMismatchError::check("elevation band", band.crs, band_crs)?;
        }
        for segment in segments {
            CrsMismatchError::check("road segment", band.crs, segment.crs)?;
        }
    }

    let mut overlaid = Vec::new();
    for band in bands {
        for segment in segments {
            match clip_lines(&segment.geometry, &band.polygon) {
                Ok(clipped) if clipped.0.is_empty() => {}
                Ok(clipped) => overlaid.push(segment.with_elevation(clipped, band.elevation)),
                Err(err) => log::warn!("Skipping road on {} m band: {}", band.elevation, err),
            }
        }
    }
    Ok(overlaid)
}
