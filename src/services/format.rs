//! Output format handling service
//!
//! This module separates output container decisions from business logic:
//! resolving the requested format against the upload, the 4K safeguard,
//! and per-format extensions, media types and encoder parameters.

use crate::{
    config::{OutputConfig, OutputFormat},
    types::{split_extension, FormatRequest, ScaleOption},
};

/// Format-specific encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeParams {
    /// PNG compression level (0-9)
    Png { compression: u8 },
    /// JPEG quality (0-100)
    Jpeg { quality: u8 },
}

impl EncodeParams {
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Png { .. } => OutputFormat::Png,
            Self::Jpeg { .. } => OutputFormat::Jpeg,
        }
    }
}

/// Service for per-format output details
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// File extension (without the dot)
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::{services::OutputFormatHandler, config::OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// MIME type for the `Content-Type` header
    #[must_use]
    pub fn get_media_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// Encoder parameters for a format under the configured output settings
    #[must_use]
    pub fn encode_params(format: OutputFormat, output: &OutputConfig) -> EncodeParams {
        match format {
            OutputFormat::Png => EncodeParams::Png {
                compression: output.png_compression,
            },
            OutputFormat::Jpeg => EncodeParams::Jpeg {
                quality: output.jpeg_quality,
            },
        }
    }

    /// Download name for the produced artifact: `<stem>_out.<ext>`
    #[must_use]
    pub fn output_filename(original_filename: &str, format: OutputFormat) -> String {
        let (stem, _) = split_extension(original_filename);
        format!("{stem}_out.{}", Self::get_extension(format))
    }
}

/// Resolves the container format for a request
pub struct FormatPolicy;

impl FormatPolicy {
    /// Resolve the output format
    ///
    /// 1. Explicit `PNG`/`JPG` is used as-is.
    /// 2. `AUTO` follows the upload extension: `jpg`/`jpeg` give JPEG, anything else PNG.
    /// 3. A `4k` PNG is forced to JPEG.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::{
    ///     config::OutputFormat,
    ///     services::FormatPolicy,
    ///     types::{FormatRequest, ScaleOption},
    /// };
    ///
    /// let format = FormatPolicy::resolve(FormatRequest::Auto, "a.jpeg", &ScaleOption::X2);
    /// assert_eq!(format, OutputFormat::Jpeg);
    /// let format = FormatPolicy::resolve(FormatRequest::Png, "a.png", &ScaleOption::K4);
    /// assert_eq!(format, OutputFormat::Jpeg);
    /// ```
    #[must_use]
    pub fn resolve(request: FormatRequest, filename: &str, scale: &ScaleOption) -> OutputFormat {
        let resolved = match request {
            FormatRequest::Png => OutputFormat::Png,
            FormatRequest::Jpg => OutputFormat::Jpeg,
            FormatRequest::Auto => {
                let format = Self::from_extension(filename);
                tracing::info!(format = %format, "AUTO format selected from upload extension");
                format
            },
        };

        if scale.is_4k() && resolved == OutputFormat::Png {
            tracing::warn!("4K PNG output is too heavy to encode and stream; switching to JPG");
            return OutputFormat::Jpeg;
        }

        resolved
    }

    fn from_extension(filename: &str) -> OutputFormat {
        match split_extension(filename).1 {
            Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
                OutputFormat::Jpeg
            },
            _ => OutputFormat::Png,
        }
    }
}
