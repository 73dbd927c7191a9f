//! Error kinds for the detection service.
//!
//! `InputError` is the caller's fault (HTTP 400), `PredictionError` is a
//! failed request (HTTP 500) and `ModelError` stops the process before it
//! starts serving.

use std::path::PathBuf;
use thiserror::Error;

/// The request did not carry usable image data
#[derive(Debug, Error)]
pub enum InputError {
    #[error("No image data provided")]
    MissingImage,

    #[error("Invalid request body: {0}")]
    Body(String),
}

/// The network artifact or its class list could not be brought up
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("trained model file not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to load trained model from {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: tch::TchError,
    },

    #[error("failed to read class labels from {}: {source}", .path.display())]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("class list is empty")]
    EmptyClasses,

    #[error("model emits {actual} scores but {expected} classes are configured")]
    ClassCountMismatch { expected: usize, actual: usize },

    #[error("probe inference failed: {0}")]
    Probe(#[source] InferenceError),

    #[error("failed to read configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A single prediction request failed
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Failed to process image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),
}

/// The image payload could not be turned into pixels
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("data URL has no payload separator")]
    DataUrl,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unsupported image: {0}")]
    Image(#[from] image::ImageError),
}

/// The forward pass or its output was unusable
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0}")]
    Torch(#[from] tch::TchError),

    #[error("expected {expected} scores, network returned {actual}")]
    OutputSize { expected: usize, actual: usize },

    #[error("network produced non-finite scores")]
    NonFinite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_messages() {
        assert_eq!(PredictionError::ModelNotLoaded.to_string(), "Model not loaded");

        let err: PredictionError = DecodeError::DataUrl.into();
        assert_eq!(
            err.to_string(),
            "Failed to process image: data URL has no payload separator"
        );

        let err: PredictionError = InferenceError::OutputSize {
            expected: 8,
            actual: 3,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Prediction failed: expected 8 scores, network returned 3"
        );
    }

    #[test]
    fn test_input_messages() {
        assert_eq!(InputError::MissingImage.to_string(), "No image data provided");
        assert_eq!(
            InputError::Body("EOF".into()).to_string(),
            "Invalid request body: EOF"
        );
    }
}
