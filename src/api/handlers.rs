//! Request handlers

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::batch::{self, RESULT_FILE_NAME};
use crate::error::ShieldError;
use crate::heuristics;
use crate::metrics::MetricsSnapshot;
use crate::models::ModelInfo;
use crate::threshold::Threshold;
use crate::types::{FeatureRecord, Record, Transaction, Verdict};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    timestamp: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.service.name().to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.service.info())
}

/// Anonymized record as free text or as a JSON array
#[derive(Debug, Deserialize)]
pub struct FeaturesRequest {
    pub input: Option<String>,
    pub values: Option<Vec<f64>>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    /// Parsed input, rounded to four decimals
    pub input: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

pub async fn predict_features(
    State(state): State<AppState>,
    payload: Result<Json<FeaturesRequest>, JsonRejection>,
) -> ApiResult<Json<FeaturesResponse>> {
    let Json(request) = payload.map_err(|e| state.reject(e.into()))?;

    let record = match (request.input.as_deref(), request.values.as_deref()) {
        (Some(text), None) => FeatureRecord::parse(text),
        (None, Some(values)) => FeatureRecord::new(values),
        (Some(_), Some(_)) => Err(ShieldError::invalid("provide either input or values, not both")),
        (None, None) => Err(ShieldError::invalid("missing input")),
    }
    .map_err(|e| state.reject(e.into()))?;

    let threshold = state.threshold(request.threshold)?;
    let input = record.display_rounded();
    let verdict = state.score(record.into(), threshold)?;

    Ok(Json(FeaturesResponse { input, verdict }))
}

#[derive(Debug, Serialize)]
pub struct SampleResponse {
    pub values: FeatureRecord,
    pub input: String,
}

pub async fn sample() -> Json<SampleResponse> {
    let record = FeatureRecord::sample();
    Json(SampleResponse {
        input: record.display_rounded(),
        values: record,
    })
}

/// Score the fixed sample transaction at the default threshold
pub async fn predict_sample(State(state): State<AppState>) -> ApiResult<Json<FeaturesResponse>> {
    let record = FeatureRecord::sample();
    let input = record.display_rounded();
    let verdict = state.score(record.into(), Threshold::default())?;

    Ok(Json(FeaturesResponse { input, verdict }))
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub threshold: Option<f64>,
}

pub async fn predict_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<Json<Verdict>> {
    let Json(request) = payload.map_err(|e| state.reject(e.into()))?;

    let threshold = state.threshold(request.threshold)?;
    let flags = heuristics::flags(&request.transaction);
    let verdict = state
        .score(request.transaction.into(), threshold)?
        .with_flags(flags);

    Ok(Json(verdict))
}

/// Score an uploaded CSV table and return it as an attachment
pub async fn predict_batch(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let started = Instant::now();
    let service = state.service.clone();

    let scored = tokio::task::spawn_blocking(move || {
        let table = batch::score_csv(&service, body.as_ref())?;
        let csv = table.to_csv()?;
        Ok::<_, ShieldError>((table, csv))
    })
    .await
    .map_err(|e| ShieldError::prediction(format!("batch task failed: {}", e)));

    let (table, csv) = match scored {
        Ok(Ok(out)) => out,
        Ok(Err(e)) | Err(e) => return Err(state.observe_error(e)),
    };

    let fraud_probabilities: Vec<f64> = table
        .prediction()
        .probabilities
        .iter()
        .map(|p| p.fraud())
        .collect();
    state
        .metrics
        .record_batch(started.elapsed(), &fraud_probabilities, table.fraud_count());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", RESULT_FILE_NAME),
            ),
        ],
        csv,
    )
        .into_response())
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

impl AppState {
    /// Score one record and record the outcome
    fn score(&self, record: Record, threshold: Threshold) -> ApiResult<Verdict> {
        let started = Instant::now();
        let probabilities = self
            .service
            .predict_proba(&record)
            .map_err(|e| self.observe_error(e))?;
        let verdict = Verdict::new(probabilities, threshold);

        self.metrics.record_prediction(
            started.elapsed(),
            verdict.fraud_probability,
            verdict.fraud,
        );
        debug!(
            schema = record.schema_name(),
            fraud_probability = verdict.fraud_probability,
            threshold = verdict.threshold,
            fraud = verdict.fraud,
            "Record scored"
        );

        Ok(verdict)
    }

    fn threshold(&self, requested: Option<f64>) -> ApiResult<Threshold> {
        self.default_threshold
            .or_override(requested)
            .map_err(|e| self.observe_error(e))
    }

    fn reject(&self, err: ApiError) -> ApiError {
        self.metrics.record_rejection();
        err
    }

    fn observe_error(&self, err: ShieldError) -> ApiError {
        match err {
            ShieldError::InvalidRecord(_) => self.metrics.record_rejection(),
            _ => self.metrics.record_failure(),
        }
        ApiError(err)
    }
}
