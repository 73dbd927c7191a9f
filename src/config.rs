//! Service configuration.
//!
//! Sources are layered in order: built-in defaults, `config/default.toml`
//! (optional), an explicit file given on the command line, then environment
//! variables prefixed with `LEAFSCAN__` (e.g. `LEAFSCAN__SERVER__PORT=8080`).

use crate::error::ModelError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest accepted input side, in pixels
pub const MAX_INPUT_SIDE: u32 = 4096;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "LEAFSCAN";

/// The classes the bundled tea model was trained on, in training order
/// (alphabetical as enumerated by the training pipeline)
pub const TEA_CLASSES: [&str; 8] = [
    "algal leaf",
    "Anthracnose",
    "bird eye spot",
    "brown blight",
    "gray light",
    "healthy",
    "red leaf spot",
    "white spot",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Maximum JSON body size, in megabytes
    pub body_limit_mb: usize,

    /// Reported by `GET /health`
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".into(),
            port: 5000,
            body_limit_mb: 16,
            service_name: "Tea Leaf Disease Detection API".into(),
        }
    }
}

impl ServerConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

/// Memory layout of the input tensor handed to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `[1, height, width, 3]`
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

/// How pixel values are scaled before the forward pass. Must match the
/// artifact: a network with its own rescaling layer wants `Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Native 0-255 range
    Raw,
    /// Divided by 255
    Unit,
    /// Divided by 255, then ImageNet mean/std normalization
    Imagenet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// TorchScript artifact
    pub artifact_path: PathBuf,

    /// Optional file of class labels, one per line, stored next to the
    /// artifact. Takes precedence over `classes`.
    pub labels_path: Option<PathBuf>,

    pub classes: Vec<String>,
    pub input_height: u32,
    pub input_width: u32,
    pub layout: Layout,
    pub scaling: Scaling,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            artifact_path: "models/tea_disease_model.pt".into(),
            labels_path: None,
            classes: TEA_CLASSES.iter().map(|c| c.to_string()).collect(),
            input_height: 224,
            input_width: 224,
            layout: Layout::Nhwc,
            scaling: Scaling::Raw,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins if set
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info,actix_web=info".into(),
        }
    }
}

impl Config {
    /// Load from the default locations, an optional explicit file and the
    /// environment
    pub fn load(path: Option<&Path>) -> Result<Self, ModelError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let builder =
            builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        Self::from_builder(builder)
    }

    /// Finish a prepared builder: deserialize and validate
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ModelError> {
        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.server.body_limit_mb == 0 {
            return Err(ModelError::Invalid(
                "server.body_limit_mb must be greater than 0".into(),
            ));
        }
        let sides = [self.model.input_height, self.model.input_width];
        if sides.iter().any(|s| *s == 0 || *s > MAX_INPUT_SIDE) {
            return Err(ModelError::Invalid(format!(
                "model input size must be within 1..={MAX_INPUT_SIDE}, got {}x{}",
                self.model.input_width, self.model.input_height
            )));
        }
        if self.model.labels_path.is_none() && self.model.classes.is_empty() {
            return Err(ModelError::EmptyClasses);
        }
        Ok(())
    }
}
