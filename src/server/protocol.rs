use crate::prediction::Prediction;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// `POST /predict` body. `image` is raw base64 or a `data:image/...` URL.
#[derive(Deserialize)]
pub struct PredictRequest {
    pub image: Option<String>,
}

impl Debug for PredictRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.image {
            Some(image) => write!(f, "PredictRequest {{ image: <{} bytes> }}", image.len()),
            None => write!(f, "PredictRequest {{ image: None }}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ClassesResponse {
    pub classes: Vec<String>,
    pub total_classes: usize,
}

impl From<&[String]> for ClassesResponse {
    fn from(classes: &[String]) -> Self {
        ClassesResponse {
            classes: classes.to_vec(),
            total_classes: classes.len(),
        }
    }
}

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub success: bool,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        ErrorResponse {
            error,
            success: false,
        }
    }
}

/// Body of a successful prediction: the prediction fields plus
/// `success: true`
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    #[serde(flatten)]
    pub prediction: Prediction,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        PredictResponse {
            success: true,
            prediction,
        }
    }
}
