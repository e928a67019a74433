//! Exact clipping of contour polygons and road lines against tile outlines.
//!
//! Results are checked before they leave this module: non-finite
//! coordinates fail with [`GeometryError`], rings with fewer than four
//! coordinates and zero-area slivers are dropped.

use geo::{
    Area, BooleanOps, BoundingRect, LineString, MapCoords, MultiLineString, MultiPolygon, Polygon,
    Rect, coord,
};

use crate::error::GeometryError;

/// Polygons with less area than this (in squared frame units) are slivers
const MIN_POLYGON_AREA: f64 = 1e-12;

/// Intersection of `subject` with `mask`
pub fn clip_polygons(
    subject: &MultiPolygon<f64>,
    mask: &Polygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryError> {
    check_polygons("clip subject", subject)?;
    check_polygon("clip mask", mask)?;

    let clipped = subject.intersection(&MultiPolygon::new(vec![mask.clone()]));
    check_polygons("clip result", &clipped)?;

    Ok(MultiPolygon::new(
        clipped
            .into_iter()
            .filter(|p| p.exterior().0.len() >= 4 && p.unsigned_area() > MIN_POLYGON_AREA)
            .collect(),
    ))
}

/// Parts of `lines` inside `mask`
pub fn clip_lines(
    lines: &MultiLineString<f64>,
    mask: &MultiPolygon<f64>,
) -> Result<MultiLineString<f64>, GeometryError> {
    check_lines("clip subject", lines)?;
    check_polygons("clip mask", mask)?;

    let clipped = mask.clip(lines, false);
    check_lines("clip result", &clipped)?;

    Ok(MultiLineString::new(
        clipped
            .into_iter()
            .filter(|line| line.0.len() >= 2 && line.0.windows(2).any(|w| w[0] != w[1]))
            .collect(),
    ))
}

/// Geographic `polygon` cut into parts that each stay within [-180, 180]
///
/// A polygon whose longitudes span more than half the globe is taken to
/// cross the antimeridian. Any other polygon comes back unchanged.
pub fn split_at_antimeridian(polygon: &Polygon<f64>) -> Result<Vec<Polygon<f64>>, GeometryError> {
    check_polygon("antimeridian split", polygon)?;
    let Some(rect) = polygon.bounding_rect() else {
        return Ok(Vec::new());
    };
    if rect.width() <= 180.0 {
        return Ok(vec![polygon.clone()]);
    }

    let unwrapped = MultiPolygon::new(vec![polygon.map_coords(|c| {
        if c.x < 0.0 {
            coord! { x: c.x + 360.0, y: c.y }
        } else {
            c
        }
    })]);
    let south = rect.min().y - 1.0;
    let north = rect.max().y + 1.0;
    let eastern = Rect::new(coord! { x: 0.0, y: south }, coord! { x: 180.0, y: north });
    let western = Rect::new(coord! { x: 180.0, y: south }, coord! { x: 360.0, y: north });

    let mut parts = clip_polygons(&unwrapped, &eastern.to_polygon())?.0;
    parts.extend(
        clip_polygons(&unwrapped, &western.to_polygon())?
            .into_iter()
            .map(|p| p.map_coords(|c| coord! { x: c.x - 360.0, y: c.y })),
    );
    Ok(parts)
}

fn check_ring(context: &str, ring: &LineString<f64>) -> Result<(), GeometryError> {
    match ring
        .coords()
        .find(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        Some(c) => Err(GeometryError::new(
            context,
            format!("non-finite coordinate ({}, {})", c.x, c.y),
        )),
        None => Ok(()),
    }
}

fn check_polygon(context: &str, polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    check_ring(context, polygon.exterior())?;
    for hole in polygon.interiors() {
        check_ring(context, hole)?;
    }
    Ok(())
}

fn check_polygons(context: &str, polygons: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    polygons.iter().try_for_each(|p| check_polygon(context, p))
}

fn check_lines(context: &str, lines: &MultiLineString<f64>) -> Result<(), GeometryError> {
    lines.iter().try_for_each(|l| check_ring(context, l))
}
