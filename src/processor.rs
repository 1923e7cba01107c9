//! Unified upscale processor
//!
//! This module provides the `UpscaleProcessor` that sequences one upload
//! through decode, enhancement, resize, format resolution and encode. The
//! HTTP layer calls it on a blocking worker; it can equally be driven
//! directly from library code.

use crate::{
    config::OutputConfig,
    dispatcher::EnhancementDispatcher,
    error::Result,
    models::EngineState,
    services::{AspectResizer, FormatPolicy, ImageCodec, OutputFormatHandler, ResizePolicy},
    types::{Dimensions, ProcessingTimings, UpscaleOutput, UpscaleRequest},
};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info, instrument, span, Level};

/// Runs the upload-to-artifact pipeline
#[derive(Debug, Clone)]
pub struct UpscaleProcessor {
    dispatcher: EnhancementDispatcher,
    output: OutputConfig,
}

impl UpscaleProcessor {
    #[must_use]
    pub fn new(state: Arc<EngineState>, output: OutputConfig) -> Self {
        Self {
            dispatcher: EnhancementDispatcher::new(state),
            output,
        }
    }

    /// Whether the engines loaded at startup
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.dispatcher.is_ready()
    }

    #[must_use]
    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    /// Process one upload into an encoded artifact
    ///
    /// # Errors
    /// - `UpscaleError::ServiceNotReady` when the engines are unavailable (checked first)
    /// - `UpscaleError::Decode` for unreadable uploads
    /// - `UpscaleError::Inference` for engine failures
    /// - `UpscaleError::Encode` when the result cannot be encoded
    #[instrument(
        skip(self, request),
        fields(
            filename = %request.image.filename,
            scale = %request.scale,
            face_enhance = request.use_face_enhance
        )
    )]
    pub fn process(&self, request: &UpscaleRequest) -> Result<UpscaleOutput> {
        if !self.is_ready() {
            return Err(crate::error::UpscaleError::ServiceNotReady);
        }

        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        let image = {
            let _span = span!(Level::DEBUG, "decode", bytes = request.image.bytes.len()).entered();
            let start = Instant::now();
            let image = ImageCodec::decode(&request.image.bytes)?;
            timings.decode_ms = start.elapsed().as_millis() as u64;
            image
        };

        let original = Dimensions::new(image.width(), image.height());
        let orientation = original.orientation();
        info!(
            dimensions = %original,
            ?orientation,
            "Decoded upload"
        );

        let enhanced = {
            let _span = span!(Level::INFO, "enhance").entered();
            let start = Instant::now();
            let enhanced =
                self.dispatcher
                    .enhance(&image, request.use_face_enhance, &request.scale)?;
            timings.enhance_ms = start.elapsed().as_millis() as u64;
            enhanced
        };
        drop(image);
        debug!(width = enhanced.width(), height = enhanced.height(), "Enhanced");

        let resized = {
            let _span = span!(Level::DEBUG, "resize").entered();
            let start = Instant::now();
            let target =
                ResizePolicy::resolve(&request.scale, orientation, original.width, original.height);
            debug!(?target, "Resize target");
            let resized = AspectResizer::resize(enhanced, target);
            timings.resize_ms = start.elapsed().as_millis() as u64;
            resized
        };

        let format = FormatPolicy::resolve(request.format, &request.image.filename, &request.scale);
        let bytes = {
            let _span = span!(Level::DEBUG, "encode", %format).entered();
            let start = Instant::now();
            let params = OutputFormatHandler::encode_params(format, &self.output);
            let bytes = ImageCodec::encode(&resized, params)?;
            timings.encode_ms = start.elapsed().as_millis() as u64;
            bytes
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        let output = Dimensions::new(resized.width(), resized.height());
        info!(
            original = %original,
            output = %output,
            %format,
            bytes = bytes.len(),
            total_ms = timings.total_ms,
            "Upscale complete"
        );

        Ok(UpscaleOutput {
            bytes,
            format,
            filename: OutputFormatHandler::output_filename(&request.image.filename, format),
            original,
            output,
            timings,
        })
    }
}
