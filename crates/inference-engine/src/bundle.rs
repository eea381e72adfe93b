//! Scaler + Model Bundles

use crate::model::Regressor;
use crate::scaler::Scaler;
use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Forecast steps produced per call (t+1, t+2, t+3)
pub const OUTPUT_HORIZONS: usize = 3;

/// Three-step forecast in real units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
}

/// Input scaler, regressor and output scaler fitted together
#[derive(Debug)]
pub struct ModelBundle {
    input_scaler: Scaler,
    model: Regressor,
    output_scaler: Scaler,
}

impl ModelBundle {
    /// Assemble a bundle, checking that the pieces agree on dimensions
    pub fn new(input_scaler: Scaler, model: Regressor, output_scaler: Scaler) -> Result<Self, InferenceError> {
        if let Some(dim) = input_scaler.dimension() {
            if dim != model.input_dim() {
                return Err(InferenceError::InvalidInputShape {
                    expected: model.input_dim(),
                    actual: dim,
                });
            }
        }
        if let Some(dim) = output_scaler.dimension() {
            if dim != OUTPUT_HORIZONS {
                return Err(InferenceError::InvalidOutputShape {
                    expected: OUTPUT_HORIZONS,
                    actual: dim,
                });
            }
        }
        Ok(Self {
            input_scaler,
            model,
            output_scaler,
        })
    }

    /// Load `scaler_x.json`, the model and `scaler_y.json` from a directory
    pub fn load_dir(dir: &Path, input_dim: usize) -> Result<Self, InferenceError> {
        info!("Loading model bundle from {}", dir.display());
        let input_scaler = Scaler::load(&dir.join("scaler_x.json"))?;
        let model = Regressor::load_dir(dir, input_dim)?;
        let output_scaler = Scaler::load(&dir.join("scaler_y.json"))?;
        Self::new(input_scaler, model, output_scaler)
    }

    /// Load a bundle that was exported without scalers
    pub fn load_model_only(dir: &Path, input_dim: usize) -> Result<Self, InferenceError> {
        info!("Loading unscaled model from {}", dir.display());
        let model = Regressor::load_dir(dir, input_dim)?;
        Self::new(Scaler::Identity, model, Scaler::Identity)
    }

    /// Expected feature count
    pub fn input_dim(&self) -> usize {
        self.model.input_dim()
    }

    /// Scale, run the model, and inverse-scale back to real units
    pub fn predict(&self, features: &FeatureVector) -> Result<Forecast, InferenceError> {
        if features.len() != self.input_dim() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.input_dim(),
                actual: features.len(),
            });
        }

        let scaled = self.input_scaler.transform(features.values())?;
        let normalized = self.model.predict(&scaled)?;
        if normalized.len() != OUTPUT_HORIZONS {
            return Err(InferenceError::InvalidOutputShape {
                expected: OUTPUT_HORIZONS,
                actual: normalized.len(),
            });
        }
        let real = self.output_scaler.inverse_transform(&normalized)?;

        let forecast = Forecast {
            t1: real[0],
            t2: real[1],
            t3: real[2],
        };
        debug!("Forecast: {:?}", forecast);
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearRegressor;
    use feature_engine::FEATURE_DIMENSION;

    /// Each output reads one input column so results are easy to follow
    fn bundle() -> ModelBundle {
        let mut coef = vec![vec![0.0; FEATURE_DIMENSION]; OUTPUT_HORIZONS];
        coef[0][3] = 1.0; // co
        coef[1][5] = 1.0; // flow
        coef[2][7] = 1.0; // weekday
        let model = LinearRegressor::new(coef, vec![0.0, 0.0, 0.0]).unwrap();

        ModelBundle::new(
            Scaler::Standard {
                mean: vec![0.0; FEATURE_DIMENSION],
                scale: vec![2.0; FEATURE_DIMENSION],
            },
            Regressor::Linear(model),
            Scaler::Standard {
                mean: vec![1.0, 1.0, 1.0],
                scale: vec![10.0, 10.0, 10.0],
            },
        )
        .unwrap()
    }

    fn features() -> FeatureVector {
        let mut values = vec![0.0; FEATURE_DIMENSION];
        values[3] = 0.5;
        values[5] = 150.0;
        values[7] = 2.0;
        FeatureVector::new(values).unwrap()
    }

    #[test]
    fn test_scaled_prediction() {
        let forecast = bundle().predict(&features()).unwrap();
        // ((x / 2) * 10) + 1
        assert_eq!(forecast, Forecast { t1: 3.5, t2: 751.0, t3: 11.0 });
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let bundle = bundle();
        let features = features();
        let first = bundle.predict(&features).unwrap();
        for _ in 0..10 {
            assert_eq!(bundle.predict(&features).unwrap(), first);
        }
    }

    #[test]
    fn test_mismatched_scaler_rejected() {
        let model = LinearRegressor::new(vec![vec![1.0; FEATURE_DIMENSION]; 3], vec![0.0; 3]).unwrap();
        let result = ModelBundle::new(
            Scaler::Standard {
                mean: vec![0.0; 10],
                scale: vec![1.0; 10],
            },
            Regressor::Linear(model),
            Scaler::Identity,
        );
        assert!(matches!(result, Err(InferenceError::InvalidInputShape { .. })));
    }

    #[test]
    fn test_wrong_output_count() {
        let model = LinearRegressor::new(vec![vec![1.0; FEATURE_DIMENSION]; 2], vec![0.0; 2]).unwrap();
        let bundle = ModelBundle::new(Scaler::Identity, Regressor::Linear(model), Scaler::Identity).unwrap();
        assert!(matches!(
            bundle.predict(&features()),
            Err(InferenceError::InvalidOutputShape { expected: 3, actual: 2 })
        ));
    }
}
