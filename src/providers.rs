//! Upstream data providers: geocoding, IP geolocation, and the live
//! air-pollution feed. Each helper returns `anyhow::Result`; the pipeline
//! maps failures onto its own taxonomy.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::constants::UNKNOWN_LOCATION_NAME;
use crate::types::PartialReading;

#[derive(Clone, Debug)]
pub struct GeocodedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct GeoDirectEntry {
    name: String,
    lat: f64,
    lon: f64,
}

/// Resolve a city name to coordinates. `Ok(None)` means the geocoder had no
/// match, which is distinct from the request itself failing.
pub async fn geocode_city(
    http: &Client,
    cfg: &Config,
    city: &str,
) -> Result<Option<GeocodedLocation>> {
    let url = format!(
        "{}/direct?q={}&limit=1&appid={}",
        cfg.geocoding_base_url,
        urlencoding::encode(city),
        cfg.owm_api_key
    );
    let response = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Geocoding request failed for '{city}'"))?;
    if !response.status().is_success() {
        bail!("Geocoding request failed ({}) for '{city}'", response.status());
    }

    let matches: Vec<GeoDirectEntry> = response
        .json()
        .await
        .context("Failed to decode geocoding response")?;

    Ok(matches.into_iter().next().map(|entry| GeocodedLocation {
        latitude: entry.lat,
        longitude: entry.lon,
        display_name: entry.name,
    }))
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: String,
    city: Option<String>,
}

/// Locate the caller by network origin via the IP geolocation provider.
pub async fn locate_by_origin(http: &Client, cfg: &Config) -> Result<GeocodedLocation> {
    let url = format!("{}/json", cfg.ip_geolocation_base_url);
    let response = http
        .get(&url)
        .send()
        .await
        .context("IP geolocation request failed")?;
    if !response.status().is_success() {
        bail!("IP geolocation request failed ({})", response.status());
    }

    let info: IpInfoResponse = response
        .json()
        .await
        .context("Failed to decode IP geolocation response")?;

    let (latitude, longitude) = parse_loc_pair(&info.loc)
        .with_context(|| format!("Malformed loc field '{}'", info.loc))?;

    Ok(GeocodedLocation {
        latitude,
        longitude,
        display_name: info
            .city
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION_NAME.to_string()),
    })
}

fn parse_loc_pair(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some((lat, lon))
}

#[derive(Debug, Default, Deserialize)]
struct AirComponents {
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    no: Option<f64>,
    no2: Option<f64>,
    nh3: Option<f64>,
    co: Option<f64>,
    so2: Option<f64>,
    o3: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    components: AirComponents,
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    list: Vec<AirPollutionEntry>,
}

/// Fetch the current pollutant components at the given coordinates. Any
/// component may be absent; benzene, toluene, and xylene are never reported
/// by this feed.
pub async fn fetch_components(
    http: &Client,
    cfg: &Config,
    latitude: f64,
    longitude: f64,
) -> Result<PartialReading> {
    let url = format!(
        "{}?lat={latitude}&lon={longitude}&appid={}",
        cfg.air_pollution_base_url, cfg.owm_api_key
    );
    let response = http
        .get(&url)
        .send()
        .await
        .context("Air pollution request failed")?;
    if !response.status().is_success() {
        bail!("Air pollution request failed ({})", response.status());
    }

    let payload: AirPollutionResponse = response
        .json()
        .await
        .context("Failed to decode air pollution response")?;
    let Some(entry) = payload.list.into_iter().next() else {
        bail!("Air pollution response contained no measurements");
    };

    let components = entry.components;
    Ok(PartialReading {
        pm2_5: components.pm2_5,
        pm10: components.pm10,
        no: components.no,
        no2: components.no2,
        nh3: components.nh3,
        co: components.co,
        so2: components.so2,
        o3: components.o3,
        benzene: None,
        toluene: None,
        xylene: None,
    })
}
