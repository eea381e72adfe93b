//! Sensor Reading Record

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// One row of the emissions source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Row identifier, increases with insertion order
    pub id: i64,
    /// Coarse particulate matter (PM10)
    pub mp10: f64,
    /// Fine particulate matter (PM2.5)
    pub mp25: f64,
    /// Carbon monoxide
    pub co: f64,
    /// Nitrogen oxides
    pub nox: f64,
    /// Vehicle count for the sampling interval
    pub vehicle_flow: f64,
    /// Local wall-clock time the reading was recorded
    pub created_at: NaiveDateTime,
}

impl SensorRecord {
    /// Hour of day, 0-23
    pub fn hour(&self) -> u32 {
        self.created_at.hour()
    }

    /// Day of week, 0 = Monday .. 6 = Sunday
    pub fn weekday(&self) -> u32 {
        self.created_at.weekday().num_days_from_monday()
    }
}
