use std::collections::HashMap;
use std::time::Duration;

use geo::Polygon;
use serde::Deserialize;

use super::{LanduseSource, RoadSource};
use crate::domain::{NetworkType, RawLanduse, RawRoad};
use crate::error::FetchError;
use crate::osm::{parse_landuse, parse_roads};

pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];
const USER_AGENT: &str = concat!("geotiles/", env!("CARGO_PKG_VERSION"));

/// Highway values kept by the `drive` network
const DRIVE_HIGHWAYS: &str = "motorway|motorway_link|trunk|trunk_link|primary|primary_link|\
secondary|secondary_link|tertiary|tertiary_link|residential|living_street|unclassified|service";

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

/// A single element from Overpass (node or way)
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default)]
    pub nodes: Option<Vec<u64>>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Roads and land use from the Overpass API, trying each mirror in turn
pub struct OverpassSource {
    client: reqwest::blocking::Client,
    mirrors: Vec<String>,
    server_timeout: Duration,
}

impl OverpassSource {
    pub fn new(mirrors: Vec<String>, timeout: Duration) -> Result<Self, FetchError> {
        let mirrors = if mirrors.is_empty() {
            DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect()
        } else {
            mirrors
        };
        // Client timeout slightly above the server-side query timeout
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout + Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            mirrors,
            server_timeout: timeout,
        })
    }

    fn query_mirror(&self, url: &str, query: &str) -> Result<OverpassResponse, FetchError> {
        // Overpass expects form-encoded `data=<query>`, not a raw body
        let response = self.client.post(url).form(&[("data", query)]).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: body.lines().take(3).collect::<Vec<_>>().join(" "),
            });
        }

        response
            .json()
            .map_err(|e| FetchError::InvalidResponse(format!("overpass JSON: {}", e)))
    }
}

impl OverpassSource {
    /// Run `query` against each mirror until one answers
    fn query(&self, query: &str) -> Result<OverpassResponse, FetchError> {
        let mut last_error = None;
        for url in &self.mirrors {
            match self.query_mirror(url, query) {
                Ok(response) => {
                    log::debug!("{} returned {} elements", url, response.elements.len());
                    return Ok(response);
                }
                Err(err) if err.is_retryable() => {
                    log::warn!("Overpass mirror {} failed: {}", url, err);
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FetchError::Unreachable("no Overpass mirror configured".to_string())
        }))
    }
}

impl RoadSource for OverpassSource {
    fn fetch_roads(
        &self,
        area: &Polygon<f64>,
        network: NetworkType,
    ) -> Result<Vec<RawRoad>, FetchError> {
        let response = self.query(&build_query(area, network, self.server_timeout.as_secs()))?;
        Ok(parse_roads(&response, network))
    }
}

impl LanduseSource for OverpassSource {
    fn fetch_landuse(
        &self,
        area: &Polygon<f64>,
        kind: &str,
    ) -> Result<Vec<RawLanduse>, FetchError> {
        let query = build_landuse_query(area, kind, self.server_timeout.as_secs());
        let response = self.query(&query)?;
        Ok(parse_landuse(&response, kind))
    }
}

/// `poly:` filter value, "lat lon lat lon ..." along the exterior ring
fn poly_filter(area: &Polygon<f64>) -> String {
    let ring = &area.exterior().0;
    // Overpass closes the polygon itself
    let open = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => &ring[..],
    };
    open.iter()
        .map(|c| format!("{:.7} {:.7}", c.y, c.x))
        .collect::<Vec<_>>()
        .join(" ")
}

fn highway_filter(network: NetworkType) -> String {
    match network {
        NetworkType::Drive => format!("[\"highway\"~\"^({})$\"]", DRIVE_HIGHWAYS),
        NetworkType::All => "[\"highway\"]".to_string(),
    }
}

fn build_query(area: &Polygon<f64>, network: NetworkType, timeout_secs: u64) -> String {
    format!(
        r#"[out:json][timeout:{timeout}];
(
  way{filter}(poly:"{poly}");
);
out body;
>;
out skel qt;"#,
        timeout = timeout_secs,
        filter = highway_filter(network),
        poly = poly_filter(area),
    )
}

fn build_landuse_query(area: &Polygon<f64>, kind: &str, timeout_secs: u64) -> String {
    format!(
        r#"[out:json][timeout:{timeout}];
(
  way["landuse"="{kind}"](poly:"{poly}");
);
out body;
>;
out skel qt;"#,
        timeout = timeout_secs,
        kind = kind.replace('"', ""),
        poly = poly_filter(area),
    )
}
