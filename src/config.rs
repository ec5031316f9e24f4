use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::constants::{
    DEFAULT_AIR_POLLUTION_BASE_URL, DEFAULT_CLASSIFIER_BASE_URL, DEFAULT_GEOCODING_BASE_URL,
    DEFAULT_HISTORY_RETENTION_RECORDS, DEFAULT_IP_GEOLOCATION_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_SECONDS,
};

#[derive(Clone)]
pub struct Config {
    pub listen_addr: String,
    pub storage_dir: PathBuf,
    pub request_timeout: Duration,
    pub history_retention_records: usize,
    pub owm_api_key: String,
    pub geocoding_base_url: String,
    pub air_pollution_base_url: String,
    pub ip_geolocation_base_url: String,
    pub classifier_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = env_string("PLANTAQ_LISTEN_ADDR", "127.0.0.1:9292");
        let storage_dir = PathBuf::from(env_string("PLANTAQ_STORAGE_DIR", "/var/lib/plantaq"));
        let request_timeout = Duration::from_secs(env_u64(
            "PLANTAQ_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);
        let history_retention_records = env_usize(
            "PLANTAQ_HISTORY_RETENTION_RECORDS",
            DEFAULT_HISTORY_RETENTION_RECORDS,
        )?;
        let owm_api_key = std::env::var("PLANTAQ_OWM_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .context("PLANTAQ_OWM_API_KEY must be set")?;
        let geocoding_base_url = trim_base_url(&env_string(
            "PLANTAQ_GEOCODING_BASE_URL",
            DEFAULT_GEOCODING_BASE_URL,
        ));
        let air_pollution_base_url = trim_base_url(&env_string(
            "PLANTAQ_AIR_POLLUTION_BASE_URL",
            DEFAULT_AIR_POLLUTION_BASE_URL,
        ));
        let ip_geolocation_base_url = trim_base_url(&env_string(
            "PLANTAQ_IP_GEOLOCATION_BASE_URL",
            DEFAULT_IP_GEOLOCATION_BASE_URL,
        ));
        let classifier_base_url = trim_base_url(&env_string(
            "PLANTAQ_CLASSIFIER_BASE_URL",
            DEFAULT_CLASSIFIER_BASE_URL,
        ));

        Ok(Self {
            listen_addr,
            storage_dir,
            request_timeout,
            history_retention_records,
            owm_api_key,
            geocoding_base_url,
            air_pollution_base_url,
            ip_geolocation_base_url,
            classifier_base_url,
        })
    }

    pub fn records_dir(&self) -> PathBuf {
        self.storage_dir.join("records")
    }
}

fn trim_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {}={} as u64", name, value)),
        Err(_) => Ok(default),
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<usize>()
            .with_context(|| format!("Failed to parse {}={} as usize", name, value)),
        Err(_) => Ok(default),
    }
}
