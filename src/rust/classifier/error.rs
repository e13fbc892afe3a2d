use ort::Error as OrtError;
use std::fmt;

use crate::labels::UnknownLabelError;

/// Errors raised while building or running the tone classification pipeline.
#[derive(Debug)]
pub enum ClassifierError {
    /// Error occurred while loading or using the tokenizer
    TokenizerError(String),
    /// Error occurred while loading or running the ONNX model
    ModelError(String),
    /// Error occurred while assembling a classifier or session
    BuildError(String),
    /// Error occurred while embedding a text or scoring an embedding
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
    /// The model produced a label the catalog has no explanation for
    UnknownLabel(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenizerError(msg) => write!(f, "Tokenizer error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::UnknownLabel(label) => write!(f, "Unknown label '{}' is missing from the catalog", label),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}

impl From<UnknownLabelError> for ClassifierError {
    fn from(err: UnknownLabelError) -> Self {
        ClassifierError::UnknownLabel(err.0)
    }
}
