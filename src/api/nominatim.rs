use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::thread;
use std::time::Duration;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const USER_AGENT: &str = concat!("geotiles/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

/// Geocode a free-form place query to `(lon, lat)`.
///
/// Waits one second before the request (Nominatim allows one request per
/// second).
pub fn geocode(query: &str) -> Result<(f64, f64)> {
    thread::sleep(Duration::from_secs(1));

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(NOMINATIM_URL)
        .query(&[("q", query), ("format", "json"), ("limit", "1")])
        .send()
        .context("Failed to send request to Nominatim API")?;

    if !response.status().is_success() {
        bail!("Nominatim API returned error status: {}", response.status());
    }

    let results: Vec<NominatimResult> = response
        .json()
        .context("Failed to parse Nominatim JSON response")?;

    first_location(results, query)
}

fn first_location(results: Vec<NominatimResult>, query: &str) -> Result<(f64, f64)> {
    let result = results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Place not found: {}", query))?;

    let lat: f64 = result
        .lat
        .parse()
        .context("Failed to parse latitude from Nominatim response")?;
    let lon: f64 = result
        .lon
        .parse()
        .context("Failed to parse longitude from Nominatim response")?;

    log::info!("Geocoded '{}' to {}", query, result.display_name);
    Ok((lon, lat))
}
