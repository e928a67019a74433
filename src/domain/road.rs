use geo::{LineString, MultiLineString};
use serde::Deserialize;

use crate::geometry::Crs;

/// Road classification based on OSM highway tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    Motorway,
    Primary,
    Secondary,
    Tertiary,
    Residential,
}

impl RoadClass {
    /// Classify a highway tag value; `None` for ways cars cannot use
    pub fn from_highway_tag(tag: &str) -> Option<RoadClass> {
        match tag {
            "motorway" | "motorway_link" => Some(RoadClass::Motorway),
            "trunk" | "trunk_link" | "primary" | "primary_link" => Some(RoadClass::Primary),
            "secondary" | "secondary_link" => Some(RoadClass::Secondary),
            "tertiary" | "tertiary_link" => Some(RoadClass::Tertiary),
            "residential" | "living_street" | "unclassified" | "service" => {
                Some(RoadClass::Residential)
            }
            _ => None,
        }
    }
}

/// Which ways the road collaborator should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Drivable public roads
    #[default]
    Drive,
    /// Every highway way, footpaths included
    All,
}

impl NetworkType {
    pub fn accepts(&self, highway: &str) -> bool {
        match self {
            NetworkType::Drive => RoadClass::from_highway_tag(highway).is_some(),
            NetworkType::All => true,
        }
    }
}

/// A road as returned by the road collaborator, in geographic coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoad {
    pub line: LineString<f64>,
    /// Raw `lanes` tag, if any
    pub lanes: Option<String>,
}

impl RawRoad {
    pub fn new(line: LineString<f64>, lanes: Option<String>) -> Self {
        Self { line, lanes }
    }
}

/// A clipped road piece, optionally tagged with the band it lies in
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    pub geometry: MultiLineString<f64>,
    pub lanes: u32,
    pub elevation: Option<f64>,
    pub crs: Crs,
}

impl RoadSegment {
    pub fn new(geometry: MultiLineString<f64>, lanes: u32, crs: Crs) -> Self {
        Self {
            geometry,
            lanes,
            elevation: None,
            crs,
        }
    }

    pub fn with_elevation(&self, geometry: MultiLineString<f64>, elevation: f64) -> Self {
        Self {
            geometry,
            lanes: self.lanes,
            elevation: Some(elevation),
            crs: self.crs,
        }
    }
}

/// Normalize an OSM `lanes` tag to a lane count
///
/// Missing, empty, non-numeric, NaN and negative values all become 0.
/// Multi-valued tags ("2;3") use the first value; fractions are rounded.
pub fn parse_lanes(tag: Option<&str>) -> u32 {
    let Some(tag) = tag else {
        return 0;
    };
    let first = tag.split(';').next().unwrap_or("").trim();

    match first.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_road_class_from_tag() {
        assert_eq!(
            RoadClass::from_highway_tag("motorway"),
            Some(RoadClass::Motorway)
        );
        assert_eq!(
            RoadClass::from_highway_tag("primary"),
            Some(RoadClass::Primary)
        );
        assert_eq!(
            RoadClass::from_highway_tag("residential"),
            Some(RoadClass::Residential)
        );
        assert_eq!(RoadClass::from_highway_tag("footway"), None);
    }

    #[test]
    fn test_network_filter() {
        assert!(NetworkType::Drive.accepts("tertiary"));
        assert!(!NetworkType::Drive.accepts("cycleway"));
        assert!(NetworkType::All.accepts("cycleway"));
    }

    #[test]
    fn test_parse_lanes() {
        let cases = [
            (None, 0),
            (Some(""), 0),
            (Some("2"), 2),
            (Some(" 3 "), 3),
            (Some("2;3"), 2),
            (Some("1.6"), 2),
            (Some("NaN"), 0),
            (Some("nan"), 0),
            (Some("inf"), 0),
            (Some("-1"), 0),
            (Some("two"), 0),
        ];
        for (tag, expected) in cases {
            assert_eq!(parse_lanes(tag), expected, "lanes tag {:?}", tag);
        }
    }

    #[test]
    fn test_with_elevation_keeps_lanes() {
        let crs = Crs::projected(0.0, 0.0);
        let segment = RoadSegment::new(MultiLineString::new(vec![]), 4, crs);
        let tagged = segment.with_elevation(MultiLineString::new(vec![]), 105.0);
        assert_eq!(tagged.lanes, 4);
        assert_eq!(tagged.elevation, Some(105.0));
        assert_eq!(tagged.crs, crs);
    }
}
