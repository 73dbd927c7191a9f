//! Turning request payloads into network input

use crate::config::{Layout, ModelConfig, Scaling};
use crate::error::DecodeError;
use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};
use image::imageops::{self, FilterType};

/// Standard alphabet, padding optional on decode. Browsers and mobile
/// clients are inconsistent about trailing `=`.
const LENIENT: engine::GeneralPurpose = engine::GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(engine::DecodePaddingMode::Indifferent),
);

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A single-image batch ready for the forward pass
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub(crate) data: Vec<f32>,
    pub(crate) shape: [i64; 4],
}

impl ImageTensor {
    /// An all-zero batch with the given spatial size
    pub fn zeros(height: u32, width: u32, layout: Layout) -> Self {
        let shape = shape_for(height, width, layout);
        ImageTensor {
            data: vec![0.0; height as usize * width as usize * 3],
            shape,
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> [i64; 4] {
        self.shape
    }
}

fn shape_for(height: u32, width: u32, layout: Layout) -> [i64; 4] {
    let (h, w) = (height as i64, width as i64);
    match layout {
        Layout::Nhwc => [1, h, w, 3],
        Layout::Nchw => [1, 3, h, w],
    }
}

/// Drop a `data:image/...;base64,` header if present
pub fn strip_data_url(payload: &str) -> Result<&str, DecodeError> {
    if payload.starts_with("data:image") {
        payload
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or(DecodeError::DataUrl)
    } else {
        Ok(payload)
    }
}

/// Decode base64, ignoring embedded whitespace and missing padding
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(LENIENT.decode(cleaned)?)
}

/// Resizes and lays out images for one particular network
#[derive(Debug, Clone)]
pub struct Preprocessor {
    height: u32,
    width: u32,
    layout: Layout,
    scaling: Scaling,
}

impl Preprocessor {
    pub fn new(config: &ModelConfig) -> Self {
        Preprocessor {
            height: config.input_height,
            width: config.input_width,
            layout: config.layout,
            scaling: config.scaling,
        }
    }

    /// Input a network of this shape expects, filled with zeros
    pub fn blank(&self) -> ImageTensor {
        ImageTensor::zeros(self.height, self.width, self.layout)
    }

    /// Raw base64 or a data URL
    pub fn process_base64(&self, payload: &str) -> Result<ImageTensor, DecodeError> {
        let bytes = decode_base64(strip_data_url(payload)?)?;
        self.process_bytes(&bytes)
    }

    /// Any image format the `image` crate can sniff
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ImageTensor, DecodeError> {
        let image = image::load_from_memory(bytes)?;

        // Alpha is dropped and grayscale expanded
        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.width, self.height, FilterType::Triangle);

        let plane = self.height as usize * self.width as usize;
        let mut data = vec![0.0f32; plane * 3];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                let value = self.scale(pixel[c], c);
                match self.layout {
                    Layout::Nhwc => data[i * 3 + c] = value,
                    Layout::Nchw => data[c * plane + i] = value,
                }
            }
        }

        Ok(ImageTensor {
            data,
            shape: shape_for(self.height, self.width, self.layout),
        })
    }

    fn scale(&self, value: u8, channel: usize) -> f32 {
        let value = value as f32;
        match self.scaling {
            Scaling::Raw => value,
            Scaling::Unit => value / 255.,
            Scaling::Imagenet => (value / 255. - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
        }
    }
}
