//! Forecast Pipeline
//!
//! Fetch -> validate count -> assemble -> validate length -> predict ->
//! persist -> commit. Any failure ends the request; the transaction is
//! dropped uncommitted, which rolls it back and releases the connection.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use feature_engine::FeatureError;
use inference_engine::{Forecast, InferenceError, Pollutant};
use storage::{ForecastRecord, ForecastStore, ForecastTx, StorageError};
use thiserror::Error;
use tracing::{debug, info};

use crate::AppState;

/// Accepted `timestamp` layouts besides RFC 3339
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Errors ending a forecast request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("timestamp query parameter is required")]
    MissingTimestamp,
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error(transparent)]
    Features(#[from] FeatureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Metric label for the failure
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingTimestamp | PipelineError::InvalidTimestamp(_) => "invalid_request",
            PipelineError::Features(FeatureError::InsufficientData { .. }) => "insufficient_data",
            PipelineError::Features(_) => "invalid_features",
            PipelineError::Inference(_) => "inference_error",
            PipelineError::Storage(_) => "storage_error",
        }
    }
}

/// Successful forecast, already committed
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    pub base_id: i64,
    pub base_timestamp: NaiveDateTime,
    pub forecast: Forecast,
}

/// Parse the `timestamp` query value as a naive local date-time.
///
/// Offsets in RFC 3339 input are dropped and the wall-clock time is kept,
/// since the readings are stored without a timezone. A bare date means
/// midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, PipelineError> {
    let value = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_local());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| PipelineError::InvalidTimestamp(raw.to_string()))
}

/// Run one forecast for readings strictly before `before`
pub async fn run_forecast<S: ForecastStore>(
    state: &AppState<S>,
    before: NaiveDateTime,
) -> Result<ForecastOutcome, PipelineError> {
    let bundle = state.models.get(Pollutant::Co)?;

    let mut tx = state.store.begin().await?;
    let records = tx.fetch_recent(before, state.assembler.window()).await?;
    debug!("Fetched {} readings before {}", records.len(), before);

    let features = state.assembler.assemble(records)?;
    let forecast = bundle.predict(&features.vector)?;

    let record = ForecastRecord {
        base_id: features.base.id,
        t1: forecast.t1,
        t2: forecast.t2,
        t3: forecast.t3,
        base_timestamp: features.base.created_at,
    };
    tx.persist_forecast(&record).await?;
    tx.commit().await?;

    info!(
        "Forecast for base reading {} ({}): {:.4} {:.4} {:.4}",
        record.base_id, record.base_timestamp, forecast.t1, forecast.t2, forecast.t3
    );

    Ok(ForecastOutcome {
        base_id: record.base_id,
        base_timestamp: record.base_timestamp,
        forecast,
    })
}
