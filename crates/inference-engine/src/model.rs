//! Regression Models

use crate::InferenceError;
use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// ONNX regressor executed with tract
pub struct OnnxRegressor {
    plan: OnnxPlan,
    input_dim: usize,
}

impl std::fmt::Debug for OnnxRegressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRegressor")
            .field("input_dim", &self.input_dim)
            .finish_non_exhaustive()
    }
}

impl OnnxRegressor {
    /// Load and optimize an ONNX model taking a `[1, input_dim]` f32 input
    pub fn load(path: &Path, input_dim: usize) -> Result<Self, InferenceError> {
        if !path.is_file() {
            return Err(InferenceError::ArtifactMissing(path.to_path_buf()));
        }
        info!("Loading ONNX model: {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, input_dim]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))?;

        Ok(Self { plan, input_dim })
    }

    fn predict(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let data: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor = Tensor::from_shape(&[1, self.input_dim], data.as_slice())
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".into()))?;
        let values = first
            .cast_to::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let slice = values
            .as_slice::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        Ok(slice.iter().map(|v| *v as f64).collect())
    }
}

/// Multi-output linear model exported as `coef` (targets x features) and `intercept`
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

#[derive(Deserialize)]
struct LinearArtifact {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl LinearRegressor {
    /// Build from coefficient rows, one row per output
    pub fn new(coef: Vec<Vec<f64>>, intercept: Vec<f64>) -> Result<Self, String> {
        let rows = coef.len();
        let cols = coef.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err("coefficient matrix is empty".to_string());
        }
        if coef.iter().any(|row| row.len() != cols) {
            return Err("coefficient rows have different lengths".to_string());
        }
        if intercept.len() != rows {
            return Err(format!("{} intercepts for {} outputs", intercept.len(), rows));
        }
        let flat: Vec<f64> = coef.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((rows, cols), flat).map_err(|e| e.to_string())?;
        Ok(Self {
            coef,
            intercept: Array1::from(intercept),
        })
    }

    /// Load from a JSON artifact
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        if !path.is_file() {
            return Err(InferenceError::ArtifactMissing(path.to_path_buf()));
        }
        info!("Loading linear model: {}", path.display());
        let invalid = |reason: String| InferenceError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let artifact: LinearArtifact = serde_json::from_str(&data).map_err(|e| invalid(e.to_string()))?;
        Self::new(artifact.coef, artifact.intercept).map_err(invalid)
    }

    fn predict(&self, input: &[f64]) -> Vec<f64> {
        (self.coef.dot(&ArrayView1::from(input)) + &self.intercept).to_vec()
    }
}

/// Regression model behind a bundle
#[derive(Debug)]
pub enum Regressor {
    Onnx(OnnxRegressor),
    Linear(LinearRegressor),
}

impl Regressor {
    /// Load `model.onnx` from a bundle directory, falling back to `model.json`
    pub fn load_dir(dir: &Path, input_dim: usize) -> Result<Self, InferenceError> {
        let onnx = dir.join("model.onnx");
        if onnx.is_file() {
            return OnnxRegressor::load(&onnx, input_dim).map(Regressor::Onnx);
        }
        let linear = dir.join("model.json");
        if linear.is_file() {
            return LinearRegressor::load(&linear).map(Regressor::Linear);
        }
        Err(InferenceError::ArtifactMissing(onnx))
    }

    /// Expected input length
    pub fn input_dim(&self) -> usize {
        match self {
            Regressor::Onnx(model) => model.input_dim,
            Regressor::Linear(model) => model.coef.ncols(),
        }
    }

    /// Run the model on an already scaled input
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if input.len() != self.input_dim() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.input_dim(),
                actual: input.len(),
            });
        }
        let output = match self {
            Regressor::Onnx(model) => model.predict(input)?,
            Regressor::Linear(model) => model.predict(input),
        };
        debug!("Model produced {} outputs", output.len());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_prediction() {
        let model = LinearRegressor::new(
            vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![1.0, 1.0]],
            vec![0.5, 0.0, -1.0],
        )
        .unwrap();
        let regressor = Regressor::Linear(model);

        assert_eq!(regressor.input_dim(), 2);
        assert_eq!(regressor.predict(&[3.0, 4.0]).unwrap(), vec![3.5, 8.0, 6.0]);
    }

    #[test]
    fn test_linear_rejects_ragged_rows() {
        assert!(LinearRegressor::new(vec![vec![1.0, 2.0], vec![1.0]], vec![0.0, 0.0]).is_err());
        assert!(LinearRegressor::new(vec![vec![1.0]], vec![0.0, 1.0]).is_err());
        assert!(LinearRegressor::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_input_shape_checked() {
        let regressor = Regressor::Linear(LinearRegressor::new(vec![vec![1.0; 4]], vec![0.0]).unwrap());
        assert!(matches!(
            regressor.predict(&[1.0; 3]),
            Err(InferenceError::InvalidInputShape { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_onnx_prediction() {
        // MatMul + Add: out = [x3 + 0.25, 0.5 * x5 + 0.5, 2 * x8 - 1]
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/onnx_bundle");
        let regressor = Regressor::load_dir(&dir, 57).unwrap();
        assert!(matches!(regressor, Regressor::Onnx(_)));
        assert_eq!(regressor.input_dim(), 57);

        let input: Vec<f64> = (0..57).map(|i| i as f64 * 0.5).collect();
        assert_eq!(regressor.predict(&input).unwrap(), vec![1.75, 1.75, 7.0]);

        assert!(matches!(
            regressor.predict(&input[..56]),
            Err(InferenceError::InvalidInputShape { expected: 57, actual: 56 })
        ));
    }

    #[test]
    fn test_missing_model_dir() {
        let dir = std::env::temp_dir().join("co-forecast-no-such-bundle");
        assert!(matches!(
            Regressor::load_dir(&dir, 57),
            Err(InferenceError::ArtifactMissing(_))
        ));
    }
}
