//! Error types for asset loading and prediction.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading one of the two model artifacts at startup.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("artifact not found: '{0}'")]
    Missing(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt classifier '{path}': {reason}")]
    CorruptModel { path: PathBuf, reason: String },

    #[error("corrupt label decoder '{path}': {reason}")]
    CorruptDecoder { path: PathBuf, reason: String },
}

/// Failure of a single prediction. Terminal for the current interaction.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("model evaluation failed: {0}")]
    Model(String),

    #[error("model produced no output")]
    EmptyOutput,

    #[error("class index {index} is outside the decoder's {classes} classes")]
    UnknownClassIndex { index: usize, classes: usize },

    #[error("feature row has {actual} columns, model expects {expected}")]
    FeatureShape { expected: usize, actual: usize },

    #[error("value '{value}' is not a known category for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("prediction could not be executed: {0}")]
    Execution(String),
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;
