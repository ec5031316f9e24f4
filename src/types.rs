use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// The canonical 12-parameter pollutant vector plus its derived composite AQI.
///
/// Concentrations are kept at 2-decimal precision; `nox` is always derived
/// as `no + no2` and never fetched independently.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub pm2_5: f64,
    pub pm10: f64,
    pub no: f64,
    pub no2: f64,
    pub nox: f64,
    pub nh3: f64,
    pub co: f64,
    pub so2: f64,
    pub o3: f64,
    pub benzene: f64,
    pub toluene: f64,
    pub xylene: f64,
    pub aqi: u16,
}

/// Which acquisition path populated a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Api,
    History,
    Geolocation,
    SyntheticFill,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provenance {
    pub kind: SourceKind,
    pub label: String,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// A partially-populated pollutant vector as reported by a source.
///
/// `None` means the source did not report the field at all. A reported value
/// of exactly zero is also treated as missing for the synthetically-filled
/// pollutants; that policy lives in the filler, not here.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PartialReading {
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub nh3: Option<f64>,
    pub co: Option<f64>,
    pub so2: Option<f64>,
    pub o3: Option<f64>,
    pub benzene: Option<f64>,
    pub toluene: Option<f64>,
    pub xylene: Option<f64>,
}

impl PartialReading {
    /// True when the source reported nothing at all, in which case the
    /// completed record is wholly synthetic.
    pub fn is_empty(&self) -> bool {
        [
            self.pm2_5,
            self.pm10,
            self.no,
            self.no2,
            self.nh3,
            self.co,
            self.so2,
            self.o3,
            self.benzene,
            self.toluene,
            self.xylene,
        ]
        .iter()
        .all(Option::is_none)
    }
}

impl From<&MeasurementRecord> for PartialReading {
    fn from(record: &MeasurementRecord) -> Self {
        Self {
            pm2_5: Some(record.pm2_5),
            pm10: Some(record.pm10),
            no: Some(record.no),
            no2: Some(record.no2),
            nh3: Some(record.nh3),
            co: Some(record.co),
            so2: Some(record.so2),
            o3: Some(record.o3),
            benzene: Some(record.benzene),
            toluene: Some(record.toluene),
            xylene: Some(record.xylene),
        }
    }
}
