//! Code for loading and running (trained) TorchScript models

use crate::error::{InferenceError, ModelError};
use crate::preprocess::ImageTensor;
use std::path::Path;
use tch::{no_grad, CModule, Device, Kind, Tensor};
use tracing::*;

/// Anything that maps one image batch to a vector of unnormalized class
/// scores
pub trait Network: Send {
    fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

/// Load and run a TorchScript file
#[derive(Debug)]
pub struct TorchModel {
    /// The loaded torch model
    model: CModule,
}

impl TorchModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::ArtifactMissing(path.to_path_buf()));
        }

        info!("loading trained model from {}", path.display());
        let mut model = CModule::load_on_device(path, Device::Cpu).map_err(|source| {
            ModelError::Load {
                path: path.to_path_buf(),
                source,
            }
        })?;
        model.set_eval();

        Ok(TorchModel { model })
    }
}

impl Network for TorchModel {
    fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let image = Tensor::from_slice(input.data()).f_reshape(input.shape().as_slice())?;
        let output = no_grad(|| self.model.forward_ts(&[image]))?;
        let output = output.f_to_kind(Kind::Float)?.f_flatten(0, -1)?;
        Ok(Vec::<f32>::try_from(&output)?)
    }
}

/// Turn raw network scores into probabilities
pub fn softmax(logits: &[f32]) -> Result<Vec<f32>, InferenceError> {
    let probabilities = Tensor::from_slice(logits).f_softmax(-1, Some(Kind::Float))?;
    let probabilities = Vec::<f32>::try_from(&probabilities)?;

    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(InferenceError::NonFinite);
    }
    Ok(probabilities)
}
