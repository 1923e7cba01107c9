//! Enhancement engines
//!
//! Two collaborator contracts sit here: a background super-resolution
//! upscaler and a face-aware restorer. Both are backed by exported model
//! graphs run through [`ModelSession`](crate::inference::ModelSession).

pub mod face_detect;
pub mod gfpgan;
pub mod realesrgan;

pub use face_detect::{FaceBox, FaceDetector, UltraFaceDetector};
pub use gfpgan::GfpganRestorer;
pub use realesrgan::{RealEsrganUpscaler, TileConfig};

use crate::error::{Result, UpscaleError};
use image::{Rgb, RgbImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Metadata reported by a background upscale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpscaleInfo {
    /// Native magnification of the model graph
    pub model_scale: u32,
    /// Magnification actually applied to the output
    pub outscale: f32,
    /// Number of model invocations
    pub tiles: usize,
}

/// Super-resolution of a whole frame
pub trait BackgroundUpscaler: Send + Sync {
    /// Upscale by `outscale`
    ///
    /// # Errors
    /// - `UpscaleError::Inference` on any engine failure
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<(RgbImage, UpscaleInfo)>;
}

/// Options for a face-aware enhancement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceEnhanceOptions {
    /// Input is already one aligned 512x512 face
    pub has_aligned: bool,
    /// Restore only the face closest to the image centre
    pub only_center_face: bool,
    /// Composite restored faces onto an upscaled background
    pub paste_back: bool,
}

impl Default for FaceEnhanceOptions {
    fn default() -> Self {
        Self {
            has_aligned: false,
            only_center_face: false,
            paste_back: true,
        }
    }
}

/// Result of a face-aware enhancement
#[derive(Debug, Clone, Default)]
pub struct FaceEnhanceOutput {
    pub cropped_faces: Vec<RgbImage>,
    pub restored_faces: Vec<RgbImage>,
    /// Full composited frame; `None` for aligned input or without paste-back
    pub restored_image: Option<RgbImage>,
}

/// Face detection, restoration and paste-back
pub trait FaceRestorer: Send + Sync {
    /// # Errors
    /// - `UpscaleError::Inference` on any engine failure
    fn enhance(&self, image: &RgbImage, options: FaceEnhanceOptions) -> Result<FaceEnhanceOutput>;
}

/// RGB buffer to a `[1, 3, H, W]` tensor with a per-sample mapping
pub(crate) fn image_to_tensor(image: &RgbImage, normalize: impl Fn(u8) -> f32) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = normalize(pixel[channel]);
        }
    }
    tensor
}

/// `[1, 3, H, W]` tensor back to an RGB buffer; `denormalize` maps to 0..=255
pub(crate) fn tensor_to_image(
    tensor: &Array4<f32>,
    denormalize: impl Fn(f32) -> f32,
) -> Result<RgbImage> {
    let (batch, channels, height, width) = tensor.dim();
    if batch < 1 || channels != 3 {
        return Err(UpscaleError::inference(format!(
            "expected a [1, 3, H, W] tensor, got {:?}",
            tensor.shape()
        )));
    }

    let width = u32::try_from(width).map_err(|_| UpscaleError::inference("tensor too wide"))?;
    let height = u32::try_from(height).map_err(|_| UpscaleError::inference("tensor too tall"))?;
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let sample = |c: usize| {
            denormalize(tensor[[0, c, y as usize, x as usize]])
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([sample(0), sample(1), sample(2)])
    }))
}
