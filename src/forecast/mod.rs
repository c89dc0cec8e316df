//! Forecast module - feature scaling, regression network and the trained forecaster

mod model;
mod network;
mod scaler;

pub use model::{
    EpochMetrics, ForecastQuery, Forecaster, HourlyForecast, LocationForecast, TrainingHistory,
    FEATURE_COUNT,
};
pub use network::{Activation, Adam, Network};
pub use scaler::StandardScaler;

use crate::data::ProcessorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Cannot train on an empty set of aggregated groups")]
    EmptyTrainingSet,
    #[error("Expected {expected} feature columns, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
