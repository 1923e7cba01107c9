//! Image codec service
//!
//! Decodes uploaded bytes into RGB pixel buffers and encodes buffers back
//! into PNG or JPEG containers, keeping codec concerns out of the pipeline.

use crate::{
    error::{Result, UpscaleError},
    services::format::EncodeParams,
};
use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
    metadata::Orientation,
    DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader, RgbImage,
};
use std::io::Cursor;

/// Service for decoding uploads and encoding results
pub struct ImageCodec;

impl ImageCodec {
    /// Decode an uploaded image into an RGB8 buffer
    ///
    /// The container format is detected from content only. EXIF orientation
    /// is applied so the buffer matches what a viewer shows; alpha is dropped.
    ///
    /// # Errors
    /// - `UpscaleError::Decode` for empty, truncated or unsupported data
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::services::ImageCodec;
    ///
    /// assert!(ImageCodec::decode(b"definitely not an image").is_err());
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
        if bytes.is_empty() {
            return Err(UpscaleError::decode("uploaded file is empty"));
        }

        let decode_err = |e: image::ImageError| {
            log::debug!("Decode failed for {} byte upload: {}", bytes.len(), e);
            UpscaleError::decode(e.to_string())
        };

        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| UpscaleError::decode(e.to_string()))?
            .into_decoder()
            .map_err(decode_err)?;
        // Missing or unreadable EXIF leaves pixels as stored
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
        image.apply_orientation(orientation);

        let rgb = image.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(UpscaleError::decode("image has zero width or height"));
        }
        Ok(rgb)
    }

    /// Encode an RGB8 buffer with format-specific parameters
    ///
    /// # Errors
    /// - `UpscaleError::Encode` when the buffer is degenerate or the codec fails
    pub fn encode(image: &RgbImage, params: EncodeParams) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(UpscaleError::encode(format!(
                "cannot encode a {width}x{height} image"
            )));
        }

        let mut buffer = Vec::new();
        match params {
            EncodeParams::Png { compression } => {
                let encoder = PngEncoder::new_with_quality(
                    &mut buffer,
                    Self::png_compression_type(compression),
                    FilterType::Adaptive,
                );
                encoder
                    .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| UpscaleError::encode(format!("PNG: {e}")))?;
            },
            EncodeParams::Jpeg { quality } => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                encoder
                    .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| UpscaleError::encode(format!("JPEG: {e}")))?;
            },
        }

        Ok(buffer)
    }

    /// Map a 0-9 zlib-style level onto the encoder's compression presets
    fn png_compression_type(level: u8) -> CompressionType {
        match level {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}
