//! Request and result types for the upscaling pipeline

use crate::config::OutputFormat;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// Requested output scale mode
///
/// Parsed case-insensitively. Anything outside the closed set is kept as
/// `Unrecognized` and behaves exactly like `4x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleOption {
    X2,
    X4,
    X6,
    K2,
    K4,
    Unrecognized(String),
}

impl ScaleOption {
    /// Parse a form value; never fails
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "2x" => Self::X2,
            "4x" => Self::X4,
            "6x" => Self::X6,
            "2k" => Self::K2,
            "4k" => Self::K4,
            _ => Self::Unrecognized(value.to_string()),
        }
    }

    /// Nominal outscale handed to the background upscaler
    #[must_use]
    pub fn outscale(&self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X6 => 6,
            Self::X4 | Self::K2 | Self::K4 | Self::Unrecognized(_) => 4,
        }
    }

    #[must_use]
    pub fn is_4k(&self) -> bool {
        matches!(self, Self::K4)
    }
}

impl Default for ScaleOption {
    fn default() -> Self {
        Self::X4
    }
}

impl std::fmt::Display for ScaleOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X2 => write!(f, "2x"),
            Self::X4 => write!(f, "4x"),
            Self::X6 => write!(f, "6x"),
            Self::K2 => write!(f, "2k"),
            Self::K4 => write!(f, "4k"),
            Self::Unrecognized(raw) => write!(f, "{raw} (as 4x)"),
        }
    }
}

/// Requested output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatRequest {
    Png,
    Jpg,
    /// Follow the uploaded file's extension
    #[default]
    Auto,
}

impl FormatRequest {
    /// Parse a form value; unknown values encode as JPEG
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PNG" => Self::Png,
            "AUTO" => Self::Auto,
            _ => Self::Jpg,
        }
    }
}

/// Orientation of the original upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Taller than wide
    Portrait,
    /// Wider than tall, or square
    Landscape,
}

impl Orientation {
    #[must_use]
    pub fn of(width: u32, height: u32) -> Self {
        if height > width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }
}

/// Width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Raw upload as received from the client
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub filename: String,
}

impl UploadedImage {
    pub fn new<B: Into<Bytes>, S: Into<String>>(bytes: B, filename: S) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Filename without its final extension
    #[must_use]
    pub fn stem(&self) -> &str {
        split_extension(&self.filename).0
    }

    /// Final extension without the dot, if any
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        split_extension(&self.filename).1
    }
}

/// Split `name.ext` at the last dot; leading dots (`.bashrc`) are not extensions
pub(crate) fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            (&filename[..idx], Some(&filename[idx + 1..]))
        },
        _ => (filename, None),
    }
}

/// One parsed `/upscale` request
#[derive(Debug, Clone)]
pub struct UpscaleRequest {
    pub image: UploadedImage,
    pub scale: ScaleOption,
    pub format: FormatRequest,
    pub use_face_enhance: bool,
}

impl UpscaleRequest {
    /// Request with the endpoint's defaults: `4x`, `AUTO`, face enhance on
    #[must_use]
    pub fn new(image: UploadedImage) -> Self {
        Self {
            image,
            scale: ScaleOption::default(),
            format: FormatRequest::default(),
            use_face_enhance: true,
        }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: ScaleOption) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: FormatRequest) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_face_enhance(mut self, enabled: bool) -> Self {
        self.use_face_enhance = enabled;
        self
    }
}

/// Stage timings in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    pub decode_ms: u64,
    pub enhance_ms: u64,
    pub resize_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

/// Encoded artifact ready to stream back
#[derive(Debug, Clone)]
pub struct UpscaleOutput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub filename: String,
    pub original: Dimensions,
    pub output: Dimensions,
    pub timings: ProcessingTimings,
}
