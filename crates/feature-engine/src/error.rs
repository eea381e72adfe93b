//! Feature Assembly Error Types

use thiserror::Error;

/// Errors during feature assembly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// Fewer readings than the lag window needs
    #[error("insufficient data: found {found} readings, {required} required")]
    InsufficientData { found: usize, required: usize },

    /// Assembled vector does not match the model input contract
    #[error("feature vector has {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Lag ranges reach outside the reading window
    #[error("invalid feature layout: {0}")]
    InvalidLayout(String),
}
