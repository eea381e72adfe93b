//! Feature Vector Assembly

use crate::error::FeatureError;
use crate::record::SensorRecord;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

/// Readings needed per forecast
pub const WINDOW_SIZE: usize = 25;

/// Values in the base block (id, mp10, mp25, co, nox, flow, hour, weekday)
pub const BASE_FEATURES: usize = 8;

/// Number of features the model was trained on (8 base + 24 co lags + 25 flow lags)
pub const FEATURE_DIMENSION: usize = 57;

/// Feature vector for ML inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap raw values, rejecting anything but [`FEATURE_DIMENSION`] values
    pub fn new(values: Vec<f64>) -> Result<Self, FeatureError> {
        if values.len() != FEATURE_DIMENSION {
            return Err(FeatureError::DimensionMismatch {
                expected: FEATURE_DIMENSION,
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// Raw values in model input order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Positions of the lag blocks inside the reading window.
///
/// Offsets count from the base record (offset 0, newest). The co block
/// starts at 1 and the flow block at 0; the model was trained on exactly
/// this layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    /// Readings required
    pub window: usize,
    /// Offsets contributing `co` lags
    pub co_lags: Range<usize>,
    /// Offsets contributing `vehicle_flow` lags
    pub flow_lags: Range<usize>,
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self {
            window: WINDOW_SIZE,
            co_lags: 1..WINDOW_SIZE,
            flow_lags: 0..WINDOW_SIZE,
        }
    }
}

impl FeatureLayout {
    /// Number of values this layout produces
    pub fn dimension(&self) -> usize {
        BASE_FEATURES + self.co_lags.len() + self.flow_lags.len()
    }

    fn check(&self) -> Result<(), FeatureError> {
        if self.window == 0 {
            return Err(FeatureError::InvalidLayout("window must not be empty".into()));
        }
        for (name, range) in [("co", &self.co_lags), ("flow", &self.flow_lags)] {
            if range.start > range.end || range.end > self.window {
                return Err(FeatureError::InvalidLayout(format!(
                    "{} lags {:?} outside window of {}",
                    name, range, self.window
                )));
            }
        }
        Ok(())
    }
}

/// Result of a successful assembly
#[derive(Debug, Clone)]
pub struct AssembledFeatures {
    /// Newest reading, anchors the forecast
    pub base: SensorRecord,
    /// Model input
    pub vector: FeatureVector,
}

/// Builds model input vectors from recent readings
#[derive(Debug, Clone, Default)]
pub struct FeatureAssembler {
    layout: FeatureLayout,
}

impl FeatureAssembler {
    /// Create an assembler for a layout
    pub fn new(layout: FeatureLayout) -> Result<Self, FeatureError> {
        layout.check()?;
        Ok(Self { layout })
    }

    /// Readings required before assembly can run
    pub fn window(&self) -> usize {
        self.layout.window
    }

    /// Assemble the feature vector from readings in any order
    pub fn assemble(&self, mut records: Vec<SensorRecord>) -> Result<AssembledFeatures, FeatureError> {
        if records.len() < self.layout.window {
            return Err(FeatureError::InsufficientData {
                found: records.len(),
                required: self.layout.window,
            });
        }

        // Newest first, regardless of delivery order
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(self.layout.window);

        let base = records[0].clone();
        let mut values = Vec::with_capacity(self.layout.dimension());

        values.push(base.id as f64);
        values.push(base.mp10);
        values.push(base.mp25);
        values.push(base.co);
        values.push(base.nox);
        values.push(base.vehicle_flow);
        values.push(base.hour() as f64);
        values.push(base.weekday() as f64);

        values.extend(records[self.layout.co_lags.clone()].iter().map(|r| r.co));
        values.extend(records[self.layout.flow_lags.clone()].iter().map(|r| r.vehicle_flow));

        debug!(
            "Assembled {} features from {} readings (base id {})",
            values.len(),
            records.len(),
            base.id
        );

        let vector = FeatureVector::new(values)?;
        Ok(AssembledFeatures { base, vector })
    }
}
