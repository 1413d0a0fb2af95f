//! HTTP error mapping

use crate::error::ShieldError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub ShieldError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ShieldError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ShieldError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShieldError::ArtifactLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self.0 {
            ShieldError::InvalidRecord(msg) => {
                tracing::warn!(error = %msg, "Rejected input");
                msg.clone()
            }
            ShieldError::Prediction(msg) => {
                tracing::error!("Prediction error: {}", msg);
                "An error occurred during prediction".to_string()
            }
            ShieldError::ArtifactLoad(msg) => {
                tracing::error!("Artifact error: {}", msg);
                "Model is not available".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": self.0.kind(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ShieldError> for ApiError {
    fn from(err: ShieldError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ShieldError::invalid(rejection.body_text()))
    }
}
