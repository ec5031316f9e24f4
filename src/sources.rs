//! Request discrimination and source resolution.
//!
//! A request names one of three acquisition paths; the resolver validates it
//! and, for the geocoded paths, turns it into coordinates plus a display
//! name. City-name validation always happens before any network call.

use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::AcquireError;
use crate::providers::{geocode_city, locate_by_origin, GeocodedLocation};
use crate::types::SourceKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceSelector {
    HistoryLookup,
    GeocodeFetch,
    IpGeolocationFetch,
}

#[derive(Clone, Debug)]
pub struct AcquireRequest {
    pub source: SourceSelector,
    pub city: Option<String>,
}

#[derive(Clone, Debug)]
pub enum ResolvedSource {
    History { city: String },
    Located { location: GeocodedLocation, kind: SourceKind },
}

#[derive(Clone)]
pub struct SourceResolver {
    cfg: Arc<Config>,
    http: Client,
}

impl SourceResolver {
    pub fn new(cfg: Arc<Config>, http: Client) -> Self {
        Self { cfg, http }
    }

    pub async fn resolve(&self, request: &AcquireRequest) -> Result<ResolvedSource, AcquireError> {
        match request.source {
            SourceSelector::HistoryLookup => {
                let city = required_city(request)?;
                Ok(ResolvedSource::History { city })
            }
            SourceSelector::GeocodeFetch => {
                let city = required_city(request)?;
                let location = geocode_city(&self.http, &self.cfg, &city)
                    .await
                    .map_err(|error| AcquireError::SourceUnavailable {
                        detail: format!("{error:#}"),
                    })?
                    .ok_or(AcquireError::CityNotFound { city })?;
                Ok(ResolvedSource::Located {
                    location,
                    kind: SourceKind::Api,
                })
            }
            SourceSelector::IpGeolocationFetch => {
                let location = locate_by_origin(&self.http, &self.cfg).await.map_err(
                    |error| AcquireError::SourceUnavailable {
                        detail: format!("{error:#}"),
                    },
                )?;
                Ok(ResolvedSource::Located {
                    location,
                    kind: SourceKind::Geolocation,
                })
            }
        }
    }
}

/// The history and geocode paths need a non-empty city name.
pub fn required_city(request: &AcquireRequest) -> Result<String, AcquireError> {
    request
        .city
        .as_deref()
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(str::to_string)
        .ok_or(AcquireError::InvalidRequest)
}
