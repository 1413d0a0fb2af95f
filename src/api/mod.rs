//! HTTP interface
//!
//! ```text
//! GET  /health                     liveness
//! GET  /api/v1/model               loaded artifact description
//! POST /api/v1/predict/features    anonymized record (text or array)
//! GET  /api/v1/sample              fixed sample record
//! POST /api/v1/predict/sample      verdict for the sample record
//! POST /api/v1/predict/transaction transaction record + advisory flags
//! POST /api/v1/predict/batch       CSV upload -> scored CSV
//! GET  /metrics                    counters and latency
//! ```

pub mod error;
pub mod handlers;

use crate::metrics::ServiceMetrics;
use crate::models::PredictionService;
use crate::threshold::Threshold;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub metrics: Arc<ServiceMetrics>,
    /// Threshold applied when a request does not carry one
    pub default_threshold: Threshold,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, metrics: Arc<ServiceMetrics>, default_threshold: Threshold) -> Self {
        Self {
            service,
            metrics,
            default_threshold,
        }
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/v1/model", get(handlers::model_info))
        .route("/api/v1/sample", get(handlers::sample))
        .route("/api/v1/predict/features", post(handlers::predict_features))
        .route("/api/v1/predict/sample", post(handlers::predict_sample))
        .route("/api/v1/predict/transaction", post(handlers::predict_transaction))
        .route("/api/v1/predict/batch", post(handlers::predict_batch))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShieldResult;
    use crate::feature_extractor::FeatureEncoder;
    use crate::models::Classifier;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Fraud probability is the last column, clamped
    struct LastColumn {
        width: usize,
    }

    impl Classifier for LastColumn {
        fn kind(&self) -> &'static str {
            "last_column"
        }

        fn input_width(&self) -> usize {
            self.width
        }

        fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
            Ok(rows.iter().map(|r| r[self.width - 1].clamp(0.0, 1.0)).collect())
        }
    }

    fn router(encoder: FeatureEncoder) -> (Router, Arc<ServiceMetrics>) {
        let width = encoder.width();
        let service = PredictionService::new("test", encoder, Box::new(LastColumn { width })).unwrap();
        let metrics = Arc::new(ServiceMetrics::new());
        let state = AppState::new(Arc::new(service), metrics.clone(), Threshold::default());
        (create_router(state, 1024 * 1024), metrics)
    }

    fn anonymized() -> (Router, Arc<ServiceMetrics>) {
        router(FeatureEncoder::anonymized())
    }

    fn values_with_amount(amount: f64) -> Vec<f64> {
        let mut values = vec![0.0; 30];
        values[29] = amount;
        values
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = anonymized();
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model"], "test");
    }

    #[tokio::test]
    async fn test_predict_features_values() {
        let (app, metrics) = anonymized();
        let (status, body) = post_json(
            app,
            "/api/v1/predict/features",
            json!({"values": values_with_amount(0.6)}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], 1);
        assert_eq!(body["fraud"], true);
        assert_eq!(body["confidence"], "60.00%");
        assert_eq!(body["message"], "Fraudulent Transaction Detected!");
        assert!(body.get("flags").is_none());
        assert_eq!(metrics.snapshot().records_scored, 1);
    }

    #[tokio::test]
    async fn test_predict_features_threshold_override() {
        let (app, _) = anonymized();
        let (status, body) = post_json(
            app,
            "/api/v1/predict/features",
            json!({"values": values_with_amount(0.6), "threshold": 0.8}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], 0);
        assert_eq!(body["threshold"], 0.8);
        assert_eq!(body["message"], "Legitimate Transaction");
    }

    #[tokio::test]
    async fn test_predict_features_text_input() {
        let (app, _) = anonymized();
        let mut cells = vec!["0"; 29];
        cells.push("0.25");
        let (status, body) = post_json(
            app,
            "/api/v1/predict/features",
            json!({"input": cells.join(", ")}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fraud_probability"], 0.25);
    }

    #[tokio::test]
    async fn test_predict_features_wrong_count() {
        let (app, metrics) = anonymized();
        let (status, body) = post_json(
            app,
            "/api/v1/predict/features",
            json!({"values": vec![0.0; 29]}),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "invalid_record");
        assert_eq!(metrics.snapshot().rejected_inputs, 1);
        assert_eq!(metrics.snapshot().records_scored, 0);
    }

    #[tokio::test]
    async fn test_invalid_threshold_rejected() {
        let (app, _) = anonymized();
        let (status, _) = post_json(
            app,
            "/api/v1/predict/features",
            json!({"values": values_with_amount(0.6), "threshold": 1.5}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let (app, _) = anonymized();
        let request = Request::post("/api/v1/predict/features")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"values\": [1, 2"))
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_sample_is_deterministic() {
        let (app, _) = anonymized();
        let request = || Request::post("/api/v1/predict/sample").body(Body::empty()).unwrap();

        let (_, first) = send(app.clone(), request()).await;
        let (_, second) = send(app, request()).await;
        let first: Value = serde_json::from_slice(&first).unwrap();
        let second: Value = serde_json::from_slice(&second).unwrap();

        assert_eq!(first["fraud_probability"], second["fraud_probability"]);
        assert_eq!(first["threshold"], 0.5);
        assert_eq!(first["input"], second["input"]);
    }

    #[tokio::test]
    async fn test_sample_values() {
        let (app, _) = anonymized();
        let (status, body) = send(app, Request::get("/api/v1/sample").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["values"].as_array().unwrap().len(), 30);
    }

    #[tokio::test]
    async fn test_predict_transaction_with_flags() {
        let (app, _) = router(FeatureEncoder::transaction_default());
        let (status, body) = post_json(
            app,
            "/api/v1/predict/transaction",
            json!({
                "type": "TRANSFER",
                "amount": 0.0,
                "oldbalanceOrg": 5000.0,
                "newbalanceOrig": 5000.0,
                "oldbalanceDest": 0.0,
                "newbalanceDest": 0.0
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["flags"],
            json!(["AmountZero", "SenderBalanceUnchanged", "ReceiverBalanceUnchanged"])
        );
    }

    #[tokio::test]
    async fn test_transaction_on_anonymized_model() {
        let (app, _) = anonymized();
        let (status, _) = post_json(
            app,
            "/api/v1/predict/transaction",
            json!({
                "type": "PAYMENT",
                "amount": 10.0,
                "oldbalanceOrg": 100.0,
                "newbalanceOrig": 90.0,
                "oldbalanceDest": 0.0,
                "newbalanceDest": 10.0
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let (app, _) = router(FeatureEncoder::transaction_default());
        let (status, _) = post_json(
            app,
            "/api/v1/predict/transaction",
            json!({
                "type": "PAYMENT",
                "amount": -10.0,
                "oldbalanceOrg": 100.0,
                "newbalanceOrig": 90.0,
                "oldbalanceDest": 0.0,
                "newbalanceDest": 10.0
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_predict_batch_csv() {
        let (app, metrics) = anonymized();
        let header_row: Vec<String> = (0..30).map(|i| format!("c{}", i)).collect();
        let mut csv = header_row.join(",");
        for amount in ["0.9", "0.2"] {
            let mut cells = vec!["0"; 29];
            cells.push(amount);
            csv.push('\n');
            csv.push_str(&cells.join(","));
        }

        let request = Request::post("/api/v1/predict/batch")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(csv))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("fraud_predictions.csv"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Prediction,Fraud Probability,Label"));
        assert!(lines[1].ends_with(",1,0.9,Fraud"));
        assert!(lines[2].ends_with(",0,0.2,Legitimate"));

        let snap = metrics.snapshot();
        assert_eq!(snap.batch_uploads, 1);
        assert_eq!(snap.records_scored, 2);
    }

    #[tokio::test]
    async fn test_predict_batch_short_csv() {
        let (app, _) = anonymized();
        let request = Request::post("/api/v1/predict/batch")
            .body(Body::from("a,b\n1,2\n"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "The CSV must contain at least 30 columns");
    }

    #[tokio::test]
    async fn test_model_and_metrics_endpoints() {
        let (app, _) = anonymized();
        let (status, body) = send(app.clone(), Request::get("/api/v1/model").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["kind"], "last_column");
        assert_eq!(body["schema"], "anonymized");
        assert_eq!(body["feature_count"], 30);

        let (status, body) = send(app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["records_scored"], 0);
    }
}
