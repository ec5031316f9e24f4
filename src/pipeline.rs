//! Per-request acquisition pipeline.
//!
//! A run walks SourceSelected -> RawFetched -> Filled -> Complete, ending in
//! a completed record plus classifier output or a single typed failure. No
//! step is retried; a fresh request restarts the whole run. The composite
//! AQI is recomputed at the fill step on every run, never reused from stored
//! data.

use std::sync::Arc;

use chrono::Utc;
use rand::thread_rng;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classifier::{classify, ClassifierResponse};
use crate::config::Config;
use crate::fill::complete_record;
use crate::providers::fetch_components;
use crate::sources::{AcquireRequest, ResolvedSource, SourceResolver};
use crate::store::{HistoryStore, StoredRecord};
use crate::types::{MeasurementRecord, PartialReading, Provenance, SourceKind};
use crate::utils::round2;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("A city name is required for this request.")]
    InvalidRequest,
    #[error("City '{city}' not found.")]
    CityNotFound { city: String },
    #[error("No stored air-quality history for '{city}'.")]
    NoHistoryFound { city: String },
    #[error("Air-quality source unavailable: {detail}")]
    SourceUnavailable { detail: String },
    #[error("Plant classifier failed: {detail}")]
    ClassifierError { detail: String },
}

#[derive(Clone, Debug)]
pub struct AcquireOutcome {
    pub record: MeasurementRecord,
    pub provenance: Provenance,
    pub classification: ClassifierResponse,
}

pub struct Pipeline {
    cfg: Arc<Config>,
    http: Client,
    store: Arc<HistoryStore>,
    resolver: SourceResolver,
}

impl Pipeline {
    pub fn new(cfg: Arc<Config>, http: Client, store: Arc<HistoryStore>) -> Self {
        let resolver = SourceResolver::new(cfg.clone(), http.clone());
        Self {
            cfg,
            http,
            store,
            resolver,
        }
    }

    /// The single "acquire and score" entry point.
    pub async fn acquire(&self, request: &AcquireRequest) -> Result<AcquireOutcome, AcquireError> {
        let resolved = self.resolver.resolve(request).await?;
        debug!("Source selected: {resolved:?}");

        let (reading, mut provenance) = self.fetch_raw(&resolved).await?;
        debug!("Raw reading fetched from {:?}", provenance.kind);

        let record = complete_record(&reading, &mut thread_rng());
        if provenance.kind != SourceKind::History && reading.is_empty() {
            provenance.kind = SourceKind::SyntheticFill;
        }
        debug!("Record filled, AQI {}", record.aqi);

        let classification =
            classify(&self.http, &self.cfg, &record)
                .await
                .map_err(|error| AcquireError::ClassifierError {
                    detail: format!("{error:#}"),
                })?;

        if let ResolvedSource::Located { location, .. } = &resolved {
            self.remember(&location.display_name, &record).await;
        }

        Ok(AcquireOutcome {
            record,
            provenance,
            classification,
        })
    }

    async fn fetch_raw(
        &self,
        resolved: &ResolvedSource,
    ) -> Result<(PartialReading, Provenance), AcquireError> {
        match resolved {
            ResolvedSource::History { city } => {
                let stored = self
                    .store
                    .load_most_recent(city)
                    .await
                    .map_err(|error| AcquireError::SourceUnavailable {
                        detail: format!("{error:#}"),
                    })?
                    .ok_or_else(|| AcquireError::NoHistoryFound { city: city.clone() })?;

                let provenance = Provenance {
                    kind: SourceKind::History,
                    label: format!("Stored reading for {}", stored.city),
                    recorded_at: Some(stored.recorded_at),
                };
                Ok((PartialReading::from(&stored.reading), provenance))
            }
            ResolvedSource::Located { location, kind } => {
                let reading =
                    fetch_components(&self.http, &self.cfg, location.latitude, location.longitude)
                        .await
                        .map_err(|error| AcquireError::SourceUnavailable {
                            detail: format!("{error:#}"),
                        })?;

                let provenance = Provenance {
                    kind: *kind,
                    label: format!("Data from: {}", location.display_name),
                    recorded_at: None,
                };
                Ok((reading, provenance))
            }
        }
    }

    /// Completed live acquisitions seed the history store so later
    /// history-lookup requests have something to find. Best-effort: a write
    /// failure is logged, never surfaced to the caller.
    async fn remember(&self, city: &str, record: &MeasurementRecord) {
        let stored = StoredRecord {
            city: city.to_string(),
            recorded_at: Utc::now(),
            reading: record.clone(),
        };
        if let Err(error) = self.store.persist(&stored).await {
            warn!("Failed to persist history for {city}: {error:#}");
        }
    }

    /// Manual-entry scoring: re-derive `nox` and the composite AQI from the
    /// submitted concentrations, then classify. No synthetic fill here; the
    /// caller's values, zeros included, are taken as given.
    pub async fn score(
        &self,
        reading: &PartialReading,
    ) -> Result<(MeasurementRecord, ClassifierResponse), AcquireError> {
        let record = manual_record(reading);

        let classification =
            classify(&self.http, &self.cfg, &record)
                .await
                .map_err(|error| AcquireError::ClassifierError {
                    detail: format!("{error:#}"),
                })?;

        Ok((record, classification))
    }
}

/// Build a record from manually-entered concentrations. `nox` and the
/// composite AQI are always derived server-side; client-supplied values for
/// either are ignored.
fn manual_record(reading: &PartialReading) -> MeasurementRecord {
    let pm2_5 = round2(reading.pm2_5.unwrap_or(0.0));
    let pm10 = round2(reading.pm10.unwrap_or(0.0));
    let no = round2(reading.no.unwrap_or(0.0));
    let no2 = round2(reading.no2.unwrap_or(0.0));
    MeasurementRecord {
        pm2_5,
        pm10,
        no,
        no2,
        nox: round2(no + no2),
        nh3: round2(reading.nh3.unwrap_or(0.0)),
        co: round2(reading.co.unwrap_or(0.0)),
        so2: round2(reading.so2.unwrap_or(0.0)),
        o3: round2(reading.o3.unwrap_or(0.0)),
        benzene: round2(reading.benzene.unwrap_or(0.0)),
        toluene: round2(reading.toluene.unwrap_or(0.0)),
        xylene: round2(reading.xylene.unwrap_or(0.0)),
        aqi: crate::aqi::composite_aqi(pm2_5, pm10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceSelector;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_pipeline(storage_dir: PathBuf) -> Pipeline {
        let cfg = Arc::new(Config {
            listen_addr: "127.0.0.1:0".to_string(),
            storage_dir: storage_dir.clone(),
            request_timeout: Duration::from_secs(1),
            history_retention_records: 8,
            owm_api_key: "test-key".to_string(),
            geocoding_base_url: "http://127.0.0.1:1/geo".to_string(),
            air_pollution_base_url: "http://127.0.0.1:1/air".to_string(),
            ip_geolocation_base_url: "http://127.0.0.1:1/ip".to_string(),
            classifier_base_url: "http://127.0.0.1:1/classifier".to_string(),
        });
        let http = Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .unwrap();
        let store = Arc::new(HistoryStore::new(
            storage_dir,
            cfg.history_retention_records,
        ));
        Pipeline::new(cfg, http, store)
    }

    #[tokio::test]
    async fn geocode_fetch_without_city_fails_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        // Base URLs point at an unroutable port, so reaching the network
        // would surface as SourceUnavailable rather than InvalidRequest.
        let pipeline = test_pipeline(dir.path().to_path_buf());
        let request = AcquireRequest {
            source: SourceSelector::GeocodeFetch,
            city: Some("   ".to_string()),
        };
        let error = pipeline.acquire(&request).await.unwrap_err();
        assert!(matches!(error, AcquireError::InvalidRequest));
    }

    #[tokio::test]
    async fn history_lookup_without_city_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path().to_path_buf());
        let request = AcquireRequest {
            source: SourceSelector::HistoryLookup,
            city: None,
        };
        let error = pipeline.acquire(&request).await.unwrap_err();
        assert!(matches!(error, AcquireError::InvalidRequest));
    }

    #[tokio::test]
    async fn history_lookup_for_unknown_city_reports_the_city_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path().to_path_buf());
        let request = AcquireRequest {
            source: SourceSelector::HistoryLookup,
            city: Some("Atlantis".to_string()),
        };
        let error = pipeline.acquire(&request).await.unwrap_err();
        assert!(matches!(
            &error,
            AcquireError::NoHistoryFound { city } if city == "Atlantis"
        ));
        assert!(error.to_string().contains("Atlantis"));
    }

    #[test]
    fn manual_records_rederive_nox_and_aqi() {
        let reading = PartialReading {
            pm2_5: Some(140.0),
            pm10: Some(40.0),
            no: Some(10.5),
            no2: Some(4.25),
            ..Default::default()
        };
        let record = manual_record(&reading);
        assert_eq!(record.nox, 14.75);
        assert_eq!(record.aqi, 316);
    }

    #[test]
    fn manual_records_take_zeros_as_given() {
        let record = manual_record(&PartialReading::default());
        assert_eq!(record.no, 0.0);
        assert_eq!(record.co, 0.0);
        assert_eq!(record.benzene, 0.0);
        assert_eq!(record.aqi, 0);
    }

    #[test]
    fn error_messages_are_single_human_readable_lines() {
        let errors = [
            AcquireError::InvalidRequest,
            AcquireError::CityNotFound {
                city: "Atlantis".to_string(),
            },
            AcquireError::NoHistoryFound {
                city: "Atlantis".to_string(),
            },
            AcquireError::SourceUnavailable {
                detail: "connection refused".to_string(),
            },
            AcquireError::ClassifierError {
                detail: "status 500".to_string(),
            },
        ];
        for error in errors {
            let message = error.to_string();
            assert!(!message.is_empty());
            assert!(!message.contains('\n'));
        }
    }
}
