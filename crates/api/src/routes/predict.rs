//! Prediction Routes

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storage::ForecastStore;

use crate::error::ApiError;
use crate::pipeline::{self, ForecastOutcome, PipelineError};
use crate::AppState;

/// Query parameters for the predict endpoint
#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    /// Upper bound (exclusive) for the readings used
    pub timestamp: Option<String>,
}

/// Forecast payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastData {
    pub id_registro_base: i64,
    pub timestamp_base: String,
    pub previsao_co_t1: f64,
    pub previsao_co_t2: f64,
    pub previsao_co_t3: f64,
}

/// Response for the predict endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub mensagem: String,
    pub dados: ForecastData,
}

impl From<ForecastOutcome> for PredictionResponse {
    fn from(outcome: ForecastOutcome) -> Self {
        Self {
            status: "sucesso".to_string(),
            mensagem: "Predição realizada e salva no banco.".to_string(),
            dados: ForecastData {
                id_registro_base: outcome.base_id,
                timestamp_base: format_timestamp(&outcome.base_timestamp),
                previsao_co_t1: outcome.forecast.t1,
                previsao_co_t2: outcome.forecast.t2,
                previsao_co_t3: outcome.forecast.t3,
            },
        }
    }
}

/// ISO 8601 without a fraction on whole seconds, microseconds otherwise
fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    if timestamp.nanosecond() == 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Forecast CO for the three steps after the newest reading before `timestamp`
pub async fn create_prediction<S: ForecastStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PredictQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start = Instant::now();

    let result = match params.timestamp.as_deref() {
        Some(raw) => match pipeline::parse_timestamp(raw) {
            Ok(before) => pipeline::run_forecast(&state, before).await,
            Err(e) => Err(e),
        },
        None => Err(PipelineError::MissingTimestamp),
    };

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::counter!("forecast_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("forecast_pipeline_seconds").record(start.elapsed().as_secs_f64());

    Ok(Json(result?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use inference_engine::Forecast;

    fn outcome(base_timestamp: NaiveDateTime) -> ForecastOutcome {
        ForecastOutcome {
            base_id: 900,
            base_timestamp,
            forecast: Forecast { t1: 0.5, t2: 0.6, t3: 0.7 },
        }
    }

    fn eleven() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_whole_second_has_no_fraction() {
        let response = PredictionResponse::from(outcome(eleven()));
        assert_eq!(response.dados.timestamp_base, "2024-01-15T11:00:00");
    }

    #[test]
    fn test_fraction_has_six_digits() {
        let response = PredictionResponse::from(outcome(eleven() + Duration::milliseconds(250)));
        assert_eq!(response.dados.timestamp_base, "2024-01-15T11:00:00.250000");

        let response = PredictionResponse::from(outcome(eleven() + Duration::microseconds(7)));
        assert_eq!(response.dados.timestamp_base, "2024-01-15T11:00:00.000007");
    }
}
