//! In-Memory Repository

use crate::{ForecastRecord, ForecastStore, ForecastTx, StorageError};
use chrono::NaiveDateTime;
use feature_engine::SensorRecord;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Inner {
    /// Sensor readings in insertion order
    sensor_log: Mutex<Vec<SensorRecord>>,
    /// Committed forecasts
    forecasts: Mutex<Vec<ForecastRecord>>,
    /// Fail every forecast insert
    reject_writes: AtomicBool,
}

/// Repository kept in process memory, with the same query and transaction
/// semantics as the MySQL repository
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<Inner>,
}

impl MemoryRepository {
    /// Create an empty in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self::default()
    }

    /// Insert a sensor reading
    pub fn insert_sensor(&self, record: SensorRecord) -> Result<(), StorageError> {
        let mut log = self.inner.sensor_log.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;
        log.push(record);
        Ok(())
    }

    /// Committed forecasts, oldest first
    pub fn forecasts(&self) -> Result<Vec<ForecastRecord>, StorageError> {
        let forecasts = self.inner.forecasts.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;
        Ok(forecasts.clone())
    }

    /// Make every forecast insert fail, as a constraint violation would
    pub fn reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Get total forecast count
    pub fn forecast_count(&self) -> usize {
        self.inner.forecasts.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl ForecastStore for MemoryRepository {
    type Tx = MemoryForecastTx;

    async fn begin(&self) -> Result<MemoryForecastTx, StorageError> {
        Ok(MemoryForecastTx {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
        })
    }
}

/// Buffered writes, applied on commit and discarded on drop
#[derive(Debug)]
pub struct MemoryForecastTx {
    inner: Arc<Inner>,
    pending: Vec<ForecastRecord>,
}

impl ForecastTx for MemoryForecastTx {
    async fn fetch_recent(
        &mut self,
        before: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<SensorRecord>, StorageError> {
        let log = self.inner.sensor_log.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;

        let mut rows: Vec<SensorRecord> = log
            .iter()
            .filter(|r| r.created_at < before)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);

        debug!("Fetched {} readings before {}", rows.len(), before);
        Ok(rows)
    }

    async fn persist_forecast(&mut self, record: &ForecastRecord) -> Result<(), StorageError> {
        if self.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::DatabaseError(format!(
                "insert rejected for base reading {}",
                record.base_id
            )));
        }
        self.pending.push(record.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StorageError> {
        let mut forecasts = self.inner.forecasts.lock().map_err(|e| {
            StorageError::DatabaseError(format!("Lock error: {}", e))
        })?;
        debug!("Committing {} forecast rows", self.pending.len());
        forecasts.append(&mut self.pending);
        Ok(())
    }
}
