//! HTTP Error Mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feature_engine::FeatureError;
use serde_json::json;
use tracing::{error, warn};

use crate::pipeline::PipelineError;

/// Pipeline failure on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    /// Status code and `detail` message
    pub fn status_and_detail(&self) -> (StatusCode, String) {
        match &self.0 {
            PipelineError::Features(FeatureError::InsufficientData { found, required }) => (
                StatusCode::NOT_FOUND,
                format!(
                    "Dados insuficientes. A query retornou {} linhas. Necessário: {}.",
                    found, required
                ),
            ),
            PipelineError::Features(FeatureError::DimensionMismatch { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro interno: Vetor de features incompleto.".to_string(),
            ),
            PipelineError::MissingTimestamp | PipelineError::InvalidTimestamp(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Erro na execução da predição: {}", other),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status.is_server_error() {
            error!("Forecast failed: {}", self.0);
        } else {
            warn!("Forecast rejected: {}", self.0);
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
