//! Storage Layer
//!
//! Reads recent sensor readings and writes forecasts inside one transaction
//! per request. `MySqlRepository` talks to the production database;
//! `MemoryRepository` keeps everything in process.

mod config;
mod mysql;
mod repository;

pub use config::{DatabaseConfig, DatabaseEndpoint, TableConfig};
pub use mysql::{MySqlForecastTx, MySqlRepository};
pub use repository::{MemoryForecastTx, MemoryRepository};

use chrono::NaiveDateTime;
use feature_engine::SensorRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid database configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

/// Persisted forecast row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// Identifier of the reading the forecast was built from
    pub base_id: i64,
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
    /// Timestamp of the base reading
    pub base_timestamp: NaiveDateTime,
}

/// Source of per-request transactions
pub trait ForecastStore: Send + Sync + 'static {
    type Tx: ForecastTx;

    /// Acquire a connection and open a transaction on it
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StorageError>> + Send;
}

/// One request's read + write unit.
///
/// Dropping the transaction without calling [`ForecastTx::commit`] discards
/// every write and releases the connection.
pub trait ForecastTx: Send {
    /// Readings strictly older than `before`, newest first, at most `limit`
    fn fetch_recent(
        &mut self,
        before: NaiveDateTime,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SensorRecord>, StorageError>> + Send;

    /// Stage one forecast row
    fn persist_forecast(
        &mut self,
        record: &ForecastRecord,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Make staged writes visible
    fn commit(self) -> impl Future<Output = Result<(), StorageError>> + Send;
}
