//! Forecast Inference Engine
//!
//! Loads the fitted scalers and regression models exported from training and
//! turns a feature vector into a three-step CO forecast.

mod bundle;
mod model;
mod scaler;
mod store;

pub use bundle::{Forecast, ModelBundle, OUTPUT_HORIZONS};
pub use model::{LinearRegressor, OnnxRegressor, Regressor};
pub use scaler::Scaler;
pub use store::{ModelStore, Pollutant};

use std::path::PathBuf;
use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Invalid artifact {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Invalid output shape: expected {expected}, got {actual}")]
    InvalidOutputShape { expected: usize, actual: usize },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("No model bundle loaded for {0}")]
    BundleUnavailable(&'static str),
}
