use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::aqi::AqiCategory;
use crate::classifier::PlantPrediction;
use crate::pipeline::AcquireError;
use crate::sources::{AcquireRequest, SourceSelector};
use crate::types::{AppState, MeasurementRecord, PartialReading, SourceKind};
use crate::utils::format_minute;

#[derive(Debug, Deserialize)]
pub(crate) struct AcquireQuery {
    source: SourceSelector,
    city: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcquireResponse {
    record: MeasurementRecord,
    category: &'static str,
    color_token: &'static str,
    source: SourceKind,
    source_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recorded_at: Option<String>,
    recommendations: Vec<PlantPrediction>,
    all_predictions: Vec<PlantPrediction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResponse {
    record: MeasurementRecord,
    category: &'static str,
    color_token: &'static str,
    recommendations: Vec<PlantPrediction>,
    all_predictions: Vec<PlantPrediction>,
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn acquire(
    State(state): State<AppState>,
    Query(query): Query<AcquireQuery>,
) -> Response {
    let request = AcquireRequest {
        source: query.source,
        city: query.city,
    };

    match state.pipeline.acquire(&request).await {
        Ok(outcome) => {
            let category = AqiCategory::from_aqi(Some(outcome.record.aqi));
            let payload = AcquireResponse {
                category: category.label(),
                color_token: category.color_token(),
                source: outcome.provenance.kind,
                source_label: outcome.provenance.label,
                recorded_at: outcome.provenance.recorded_at.map(format_minute),
                recommendations: outcome.classification.recommendations,
                all_predictions: outcome.classification.all_predictions,
                record: outcome.record,
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

pub async fn score(State(state): State<AppState>, Json(reading): Json<PartialReading>) -> Response {
    match state.pipeline.score(&reading).await {
        Ok((record, classification)) => {
            let category = AqiCategory::from_aqi(Some(record.aqi));
            let payload = ScoreResponse {
                category: category.label(),
                color_token: category.color_token(),
                recommendations: classification.recommendations,
                all_predictions: classification.all_predictions,
                record,
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

fn error_response(error: &AcquireError) -> Response {
    (
        status_for(error),
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

fn status_for(error: &AcquireError) -> StatusCode {
    match error {
        AcquireError::InvalidRequest => StatusCode::BAD_REQUEST,
        AcquireError::CityNotFound { .. } | AcquireError::NoHistoryFound { .. } => {
            StatusCode::NOT_FOUND
        }
        AcquireError::SourceUnavailable { .. } | AcquireError::ClassifierError { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_taxonomy_maps_to_stable_status_codes() {
        assert_eq!(
            status_for(&AcquireError::InvalidRequest),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AcquireError::CityNotFound {
                city: "Atlantis".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AcquireError::NoHistoryFound {
                city: "Atlantis".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AcquireError::SourceUnavailable {
                detail: "timeout".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&AcquireError::ClassifierError {
                detail: "status 500".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
