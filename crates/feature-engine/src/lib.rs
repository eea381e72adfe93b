//! Feature Engineering Engine
//!
//! Turns the most recent sensor readings into the fixed-order feature vector
//! expected by the CO forecast model.

mod error;
mod features;
mod mapping;
mod record;

pub use error::FeatureError;
pub use features::{
    FeatureAssembler, FeatureLayout, FeatureVector, AssembledFeatures, BASE_FEATURES,
    FEATURE_DIMENSION, WINDOW_SIZE,
};
pub use mapping::{FieldMapping, SensorField};
pub use record::SensorRecord;
