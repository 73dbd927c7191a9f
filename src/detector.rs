//! The detection service: one loaded network, its class list and the
//! preprocessing it expects. Built once at startup and shared by every
//! request handler.

use crate::config::ModelConfig;
use crate::error::{InferenceError, ModelError, PredictionError};
use crate::prediction::Prediction;
use crate::preprocess::{ImageTensor, Preprocessor};
use crate::torch::{self, Network, TorchModel};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::*;

pub struct Detector {
    classes: Vec<String>,
    preprocessor: Preprocessor,

    /// Forward passes are serialized; TorchScript modules are not assumed
    /// to be re-entrant. `forward` takes `&self`, so a panicking request
    /// leaves nothing half-written and the lock is recovered.
    network: Option<Mutex<Box<dyn Network>>>,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("classes", &self.classes)
            .field("preprocessor", &self.preprocessor)
            .field("loaded", &self.network.is_some())
            .finish()
    }
}

impl Detector {
    /// Load the TorchScript artifact named by `config` and check that it
    /// agrees with the class list
    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let model = TorchModel::load(&config.artifact_path)?;
        Self::new(config, Box::new(model))
    }

    /// Wrap an already constructed network. A probe forward pass on a blank
    /// image must yield exactly one score per class.
    pub fn new(config: &ModelConfig, network: Box<dyn Network>) -> Result<Self, ModelError> {
        let classes = resolve_classes(config)?;
        let preprocessor = Preprocessor::new(config);

        let probe = network
            .forward(&preprocessor.blank())
            .map_err(ModelError::Probe)?;
        if probe.len() != classes.len() {
            return Err(ModelError::ClassCountMismatch {
                expected: classes.len(),
                actual: probe.len(),
            });
        }

        info!(
            "detector ready: {} classes, {}x{} input",
            classes.len(),
            config.input_width,
            config.input_height
        );

        Ok(Detector {
            classes,
            preprocessor,
            network: Some(Mutex::new(network)),
        })
    }

    /// A detector without a network; every prediction fails
    pub fn unloaded(config: &ModelConfig) -> Result<Self, ModelError> {
        Ok(Detector {
            classes: resolve_classes(config)?,
            preprocessor: Preprocessor::new(config),
            network: None,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn is_loaded(&self) -> bool {
        self.network.is_some()
    }

    /// Per-class probabilities for one preprocessed image
    pub fn scores(&self, input: &ImageTensor) -> Result<Vec<f32>, PredictionError> {
        let network = self
            .network
            .as_ref()
            .ok_or(PredictionError::ModelNotLoaded)?;

        let logits = {
            let network = network.lock().unwrap_or_else(PoisonError::into_inner);
            network.forward(input)?
        };

        if logits.len() != self.classes.len() {
            return Err(InferenceError::OutputSize {
                expected: self.classes.len(),
                actual: logits.len(),
            }
            .into());
        }

        Ok(torch::softmax(&logits)?)
    }

    /// Classify a base64 payload, optionally wrapped in a data URL
    pub fn predict_base64(&self, payload: &str) -> Result<Prediction, PredictionError> {
        if !self.is_loaded() {
            return Err(PredictionError::ModelNotLoaded);
        }
        let input = self.preprocessor.process_base64(payload)?;
        self.predict_tensor(&input)
    }

    /// Classify encoded image bytes
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, PredictionError> {
        if !self.is_loaded() {
            return Err(PredictionError::ModelNotLoaded);
        }
        let input = self.preprocessor.process_bytes(bytes)?;
        self.predict_tensor(&input)
    }

    fn predict_tensor(&self, input: &ImageTensor) -> Result<Prediction, PredictionError> {
        let scores = self.scores(input)?;
        let prediction = Prediction::from_scores(&scores, &self.classes);
        debug!("scores: {:?}", prediction.all_predictions);
        Ok(prediction)
    }
}

/// The labels file wins over the inline list
fn resolve_classes(config: &ModelConfig) -> Result<Vec<String>, ModelError> {
    let classes = match &config.labels_path {
        Some(path) => read_labels(path)?,
        None => config.classes.clone(),
    };

    if classes.is_empty() {
        return Err(ModelError::EmptyClasses);
    }
    Ok(classes)
}

fn read_labels(path: &Path) -> Result<Vec<String>, ModelError> {
    let labels = std::fs::read_to_string(path).map_err(|source| ModelError::Labels {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(labels
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}
