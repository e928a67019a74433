use std::collections::HashMap;

use geo::{Coord, LineString, Polygon};

use crate::api::OverpassResponse;
use crate::domain::{NetworkType, RawLanduse, RawRoad};

/// Parse an Overpass response into geographic road lines
///
/// # Algorithm
/// 1. Build node_id → (lon, lat) lookup from all node elements
/// 2. For each way with a highway tag accepted by `network`:
///    - Resolve node refs to coordinates, skipping missing nodes
///    - Keep the raw `lanes` tag for later normalization
pub fn parse_roads(response: &OverpassResponse, network: NetworkType) -> Vec<RawRoad> {
    let nodes = build_node_lookup(response);
    let mut roads = Vec::new();

    for element in &response.elements {
        if element.type_ != "way" {
            continue;
        }

        let Some(tags) = &element.tags else {
            continue;
        };
        let Some(highway) = tags.get("highway") else {
            continue;
        };
        if !network.accepts(highway) {
            continue;
        }

        let Some(node_refs) = &element.nodes else {
            continue;
        };
        let points: Vec<Coord<f64>> = node_refs
            .iter()
            .filter_map(|id| nodes.get(id).copied())
            .collect();

        if points.len() < 2 {
            continue;
        }

        roads.push(RawRoad::new(
            LineString::new(points),
            tags.get("lanes").cloned(),
        ));
    }

    roads
}

/// Parse an Overpass response into geographic land-use polygons
///
/// Only closed ways tagged `landuse=<kind>` become polygons. Missing nodes
/// are skipped; a ring left with fewer than three distinct points is dropped.
pub fn parse_landuse(response: &OverpassResponse, kind: &str) -> Vec<RawLanduse> {
    let nodes = build_node_lookup(response);
    let mut areas = Vec::new();

    for element in &response.elements {
        if element.type_ != "way" {
            continue;
        }
        let tagged = element
            .tags
            .as_ref()
            .and_then(|tags| tags.get("landuse"))
            .is_some_and(|value| value == kind);
        if !tagged {
            continue;
        }

        let Some(node_refs) = &element.nodes else {
            continue;
        };
        if node_refs.len() < 4 || node_refs.first() != node_refs.last() {
            log::debug!("Skipping unclosed landuse way {}", element.id);
            continue;
        }

        let points: Vec<Coord<f64>> = node_refs
            .iter()
            .filter_map(|id| nodes.get(id).copied())
            .collect();
        if points.len() < 4 {
            continue;
        }

        areas.push(RawLanduse::new(
            Polygon::new(LineString::new(points), vec![]),
            kind,
        ));
    }

    areas
}

fn build_node_lookup(response: &OverpassResponse) -> HashMap<u64, Coord<f64>> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            Some((e.id, Coord { x: lon, y: lat }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> OverpassResponse {
        serde_json::from_str(
            r#"{
                "elements": [
                    {"type": "node", "id": 1, "lat": 52.15, "lon": 9.95},
                    {"type": "node", "id": 2, "lat": 52.16, "lon": 9.96},
                    {"type": "node", "id": 3, "lat": 52.17, "lon": 9.97},
                    {"type": "way", "id": 100, "nodes": [1, 2, 3],
                     "tags": {"highway": "primary", "lanes": "2;3"}},
                    {"type": "way", "id": 101, "nodes": [2, 3],
                     "tags": {"highway": "footway"}},
                    {"type": "way", "id": 102, "nodes": [1, 99],
                     "tags": {"highway": "residential"}},
                    {"type": "way", "id": 103, "nodes": [1, 2],
                     "tags": {"building": "yes"}},
                    {"type": "node", "id": 4, "lat": 52.15, "lon": 9.97},
                    {"type": "way", "id": 200, "nodes": [1, 2, 3, 4, 1],
                     "tags": {"landuse": "residential"}},
                    {"type": "way", "id": 201, "nodes": [1, 2, 3, 1],
                     "tags": {"landuse": "forest"}},
                    {"type": "way", "id": 202, "nodes": [1, 2, 3],
                     "tags": {"landuse": "residential"}},
                    {"type": "way", "id": 203, "nodes": [1, 98, 99, 1],
                     "tags": {"landuse": "residential"}}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_drive_network() {
        let roads = parse_roads(&response(), NetworkType::Drive);

        assert_eq!(roads.len(), 1);
        assert_eq!(roads[0].line.0.len(), 3);
        assert_eq!(roads[0].line.0[0], Coord { x: 9.95, y: 52.15 });
        assert_eq!(roads[0].lanes.as_deref(), Some("2;3"));
    }

    #[test]
    fn test_parse_all_network() {
        let roads = parse_roads(&response(), NetworkType::All);

        assert_eq!(roads.len(), 2);
        assert_eq!(roads[1].lanes, None);
    }

    #[test]
    fn test_parse_landuse() {
        let areas = parse_landuse(&response(), "residential");

        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].kind, "residential");
        let ring = &areas[0].polygon.exterior().0;
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(ring[3], Coord { x: 9.97, y: 52.15 });

        let forest = parse_landuse(&response(), "forest");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].polygon.exterior().0.len(), 4);
    }
}
