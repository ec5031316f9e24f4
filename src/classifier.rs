//! Client for the hosted plant-classification service.
//!
//! The classifier takes the full pollutant vector as a flat key/value map
//! and returns ranked plant recommendations with confidences in [0, 1].

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::types::MeasurementRecord;

#[derive(Debug, Serialize)]
struct ClassifierPayload {
    #[serde(rename = "PM2_5")]
    pm2_5: f64,
    #[serde(rename = "PM10")]
    pm10: f64,
    #[serde(rename = "NO")]
    no: f64,
    #[serde(rename = "NO2")]
    no2: f64,
    #[serde(rename = "NOx")]
    nox: f64,
    #[serde(rename = "NH3")]
    nh3: f64,
    #[serde(rename = "CO")]
    co: f64,
    #[serde(rename = "SO2")]
    so2: f64,
    #[serde(rename = "O3")]
    o3: f64,
    #[serde(rename = "Benzene")]
    benzene: f64,
    #[serde(rename = "Toluene")]
    toluene: f64,
    #[serde(rename = "Xylene")]
    xylene: f64,
    #[serde(rename = "AQI")]
    aqi: u16,
}

impl From<&MeasurementRecord> for ClassifierPayload {
    fn from(record: &MeasurementRecord) -> Self {
        Self {
            pm2_5: record.pm2_5,
            pm10: record.pm10,
            no: record.no,
            no2: record.no2,
            nox: record.nox,
            nh3: record.nh3,
            co: record.co,
            so2: record.so2,
            o3: record.o3,
            benzene: record.benzene,
            toluene: record.toluene,
            xylene: record.xylene,
            aqi: record.aqi,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlantPrediction {
    pub plant: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub recommendations: Vec<PlantPrediction>,
    #[serde(default, rename = "allPredictions", alias = "all_predictions")]
    pub all_predictions: Vec<PlantPrediction>,
}

pub async fn classify(
    http: &Client,
    cfg: &Config,
    record: &MeasurementRecord,
) -> Result<ClassifierResponse> {
    let url = format!("{}/predict", cfg.classifier_base_url);
    let response = http
        .post(&url)
        .json(&ClassifierPayload::from(record))
        .send()
        .await
        .context("Classifier request failed")?;
    if !response.status().is_success() {
        bail!("Classifier request failed ({})", response.status());
    }

    response
        .json()
        .await
        .context("Failed to decode classifier response")
}
