//! Model Store
//!
//! Holds every bundle loaded at startup. Bundles are read-only after
//! loading and are shared across requests without locking.

use crate::bundle::ModelBundle;
use crate::InferenceError;
use feature_engine::FEATURE_DIMENSION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Pollutants with a trained forecast model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    Co,
    Mp10,
    Nox,
    Mp25,
}

impl Pollutant {
    pub const ALL: [Pollutant; 4] = [Pollutant::Co, Pollutant::Mp10, Pollutant::Nox, Pollutant::Mp25];

    /// Bundle directory under the models root
    pub fn as_str(&self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::Mp10 => "mp10",
            Pollutant::Nox => "nox",
            Pollutant::Mp25 => "mp25",
        }
    }

    /// Whether the exported bundle ships fitted scalers
    pub fn has_scalers(&self) -> bool {
        // mp25 was exported without scalers
        !matches!(self, Pollutant::Mp25)
    }
}

/// Bundles keyed by pollutant
#[derive(Debug, Default)]
pub struct ModelStore {
    bundles: HashMap<Pollutant, ModelBundle>,
}

impl ModelStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every pollutant bundle from `<root>/<pollutant>/`.
    ///
    /// Any missing or malformed artifact fails the whole load.
    pub fn load(root: &Path) -> Result<Self, InferenceError> {
        let mut store = Self::new();
        for pollutant in Pollutant::ALL {
            let dir = root.join(pollutant.as_str());
            let bundle = if pollutant.has_scalers() {
                ModelBundle::load_dir(&dir, FEATURE_DIMENSION)?
            } else {
                ModelBundle::load_model_only(&dir, FEATURE_DIMENSION)?
            };
            store.insert(pollutant, bundle);
        }
        info!("Loaded {} model bundles from {}", store.len(), root.display());
        Ok(store)
    }

    /// Add or replace a bundle
    pub fn insert(&mut self, pollutant: Pollutant, bundle: ModelBundle) {
        self.bundles.insert(pollutant, bundle);
    }

    /// Bundle for a pollutant
    pub fn get(&self, pollutant: Pollutant) -> Result<&ModelBundle, InferenceError> {
        self.bundles
            .get(&pollutant)
            .ok_or(InferenceError::BundleUnavailable(pollutant.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("co-forecast-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_linear_bundle(dir: &Path, with_scalers: bool) {
        fs::create_dir_all(dir).unwrap();
        let model = serde_json::json!({
            "coef": vec![vec![0.01; FEATURE_DIMENSION]; 3],
            "intercept": [0.0, 0.1, 0.2],
        });
        fs::write(dir.join("model.json"), model.to_string()).unwrap();
        if with_scalers {
            let x = serde_json::json!({
                "kind": "standard",
                "mean": vec![0.0; FEATURE_DIMENSION],
                "scale": vec![1.0; FEATURE_DIMENSION],
            });
            let y = serde_json::json!({
                "kind": "min_max",
                "min": [0.0, 0.0, 0.0],
                "scale": [0.5, 0.5, 0.5],
            });
            fs::write(dir.join("scaler_x.json"), x.to_string()).unwrap();
            fs::write(dir.join("scaler_y.json"), y.to_string()).unwrap();
        }
    }

    #[test]
    fn test_load_all_bundles() {
        let root = scratch_dir("store-ok");
        for pollutant in Pollutant::ALL {
            write_linear_bundle(&root.join(pollutant.as_str()), pollutant.has_scalers());
        }

        let store = ModelStore::load(&root).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(Pollutant::Co).unwrap().input_dim(), FEATURE_DIMENSION);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_scaler_is_fatal() {
        let root = scratch_dir("store-missing");
        for pollutant in Pollutant::ALL {
            write_linear_bundle(&root.join(pollutant.as_str()), pollutant.has_scalers());
        }
        fs::remove_file(root.join("nox").join("scaler_y.json")).unwrap();

        match ModelStore::load(&root) {
            Err(InferenceError::ArtifactMissing(path)) => assert!(path.ends_with("nox/scaler_y.json")),
            other => panic!("unexpected result: {:?}", other.map(|s| s.len())),
        }

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_unknown_bundle() {
        let store = ModelStore::new();
        assert!(matches!(
            store.get(Pollutant::Co),
            Err(InferenceError::BundleUnavailable("co"))
        ));
    }
}
