//! Enhancement strategy selection and engine dispatch

use crate::{
    engines::FaceEnhanceOptions,
    error::{Result, UpscaleError},
    models::EngineState,
    types::ScaleOption,
};
use image::RgbImage;
use std::sync::Arc;

/// Which engine handles a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancementStrategy {
    /// Super-resolution of the whole frame at `outscale`
    BackgroundOnly { outscale: u32 },
    /// Face restoration composited over a 4x background
    FaceAware,
}

impl EnhancementStrategy {
    /// # Examples
    /// ```rust
    /// use imgly_upscale::{dispatcher::EnhancementStrategy, types::ScaleOption};
    ///
    /// assert_eq!(
    ///     EnhancementStrategy::for_request(false, &ScaleOption::X6),
    ///     EnhancementStrategy::BackgroundOnly { outscale: 6 }
    /// );
    /// assert_eq!(
    ///     EnhancementStrategy::for_request(true, &ScaleOption::X2),
    ///     EnhancementStrategy::FaceAware
    /// );
    /// ```
    #[must_use]
    pub fn for_request(use_face_enhance: bool, scale: &ScaleOption) -> Self {
        if use_face_enhance {
            Self::FaceAware
        } else {
            Self::BackgroundOnly {
                outscale: scale.outscale(),
            }
        }
    }
}

/// Routes each request to exactly one engine
#[derive(Debug, Clone)]
pub struct EnhancementDispatcher {
    state: Arc<EngineState>,
}

impl EnhancementDispatcher {
    #[must_use]
    pub fn new(state: Arc<EngineState>) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Enhance a decoded image
    ///
    /// # Errors
    /// - `UpscaleError::ServiceNotReady` before any engine is touched, if loading failed
    /// - `UpscaleError::Inference` for engine failures or a missing composite
    pub fn enhance(
        &self,
        image: &RgbImage,
        use_face_enhance: bool,
        scale: &ScaleOption,
    ) -> Result<RgbImage> {
        let engines = self.state.engines()?;
        let strategy = EnhancementStrategy::for_request(use_face_enhance, scale);
        tracing::info!(?strategy, "Dispatching enhancement");

        let enhanced = match strategy {
            EnhancementStrategy::FaceAware => {
                let output = engines
                    .face_restorer
                    .enhance(image, FaceEnhanceOptions::default())
                    .map_err(Self::as_inference)?;
                tracing::debug!(faces = output.restored_faces.len(), "Face enhancement done");
                output.restored_image.ok_or_else(|| {
                    UpscaleError::inference("face enhancement produced no composited image")
                })?
            },
            EnhancementStrategy::BackgroundOnly { outscale } => {
                let (output, _info) = engines
                    .upscaler
                    .enhance(image, outscale as f32)
                    .map_err(Self::as_inference)?;
                output
            },
        };

        Ok(enhanced)
    }

    /// Engine failures surface as inference errors whatever their origin
    fn as_inference(error: UpscaleError) -> UpscaleError {
        match error {
            UpscaleError::Inference(_) => error,
            other => UpscaleError::inference(other.to_string()),
        }
    }
}
