//! Fitted Feature Scalers
//!
//! Parameters come straight from the fitted training scalers, so the
//! transforms below must stay byte-for-byte compatible with them:
//!
//! - `standard`: `(x - mean) / scale`
//! - `min_max`:  `x * scale + min`

use crate::InferenceError;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fitted affine scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// Zero mean, unit variance
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// Rescale to the fitted feature range
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    /// Pass-through for bundles exported without scalers
    Identity,
}

impl Scaler {
    /// Load scaler parameters from a JSON artifact
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        if !path.is_file() {
            return Err(InferenceError::ArtifactMissing(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path).map_err(|e| InferenceError::InvalidArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let scaler: Scaler = serde_json::from_str(&data).map_err(|e| InferenceError::InvalidArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        scaler.check().map_err(|reason| InferenceError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(scaler)
    }

    /// Number of columns the scaler was fitted on, `None` for identity
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Scaler::Standard { mean, .. } => Some(mean.len()),
            Scaler::MinMax { min, .. } => Some(min.len()),
            Scaler::Identity => None,
        }
    }

    fn check(&self) -> Result<(), String> {
        let (offset, scale) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
            Scaler::Identity => return Ok(()),
        };
        if offset.len() != scale.len() {
            return Err(format!(
                "parameter lengths differ ({} vs {})",
                offset.len(),
                scale.len()
            ));
        }
        if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err("scale contains zero or non-finite values".to_string());
        }
        Ok(())
    }

    fn check_len(&self, actual: usize) -> Result<(), InferenceError> {
        match self.dimension() {
            Some(expected) if expected != actual => {
                Err(InferenceError::InvalidInputShape { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// Map raw values into the normalized space
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_len(values.len())?;
        let x = ArrayView1::from(values);
        let scaled: Array1<f64> = match self {
            Scaler::Standard { mean, scale } => {
                (&x - &ArrayView1::from(mean.as_slice())) / &ArrayView1::from(scale.as_slice())
            }
            Scaler::MinMax { min, scale } => {
                &x * &ArrayView1::from(scale.as_slice()) + &ArrayView1::from(min.as_slice())
            }
            Scaler::Identity => x.to_owned(),
        };
        Ok(scaled.to_vec())
    }

    /// Map normalized values back to real units
    pub fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_len(values.len())?;
        let x = ArrayView1::from(values);
        let restored: Array1<f64> = match self {
            Scaler::Standard { mean, scale } => {
                &x * &ArrayView1::from(scale.as_slice()) + &ArrayView1::from(mean.as_slice())
            }
            Scaler::MinMax { min, scale } => {
                (&x - &ArrayView1::from(min.as_slice())) / &ArrayView1::from(scale.as_slice())
            }
            Scaler::Identity => x.to_owned(),
        };
        Ok(restored.to_vec())
    }
}
