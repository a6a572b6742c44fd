//! Prediction service backed by a frozen gradient-boosted tree ensemble.
//!
//! The model is trained offline and shipped as a JSON tree dump
//! (see [`GbtModel`]). Inference is pure and read-only, so one loaded model is
//! shared by every session without locking.
//!
//! # Quick Start
//!
//! ```ignore
//! use project_cost::gbt::{GbtModel, Regressor};
//!
//! let model = GbtModel::load(&artifacts.join("model.json"))?;
//! let cost = model.predict(&features)?;
//! ```

mod model;

pub use model::{GbtModel, ModelError, MODEL_FILE};

use thiserror::Error;

use crate::estimator::FeatureVector;

/// Request-time inference failures. Never retried.
#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("feature {name} is not a finite number: {value}")]
    NonFiniteFeature { name: &'static str, value: f64 },

    #[error("model produced a non-finite prediction: {0}")]
    NonFiniteOutput(f64),
}

/// A regression model over the fixed ten-field feature schema.
pub trait Regressor: Send + Sync {
    /// Predict a single row. The output is neither rounded nor clamped.
    fn predict(&self, row: &FeatureVector) -> Result<f64, PredictionError>;
}
