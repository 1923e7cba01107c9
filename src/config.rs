//! Configuration types for the upscaling service

use crate::error::{Result, UpscaleError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default transport-level cap on uploaded request bodies (200 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl std::str::FromStr for ExecutionProvider {
    type Err = UpscaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(UpscaleError::invalid_config(format!(
                "Unknown execution provider '{other}' (expected auto, cpu, cuda or coreml)"
            ))),
        }
    }
}

/// Inference backend used to run the exported model graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime backend (supports GPU acceleration)
    #[default]
    Onnx,
    /// Tract backend (pure Rust, no external dependencies)
    Tract,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = UpscaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "onnx" | "ort" => Ok(Self::Onnx),
            "tract" => Ok(Self::Tract),
            other => Err(UpscaleError::invalid_config(format!(
                "Unknown backend '{other}' (expected onnx or tract)"
            ))),
        }
    }
}

/// Output container formats the service can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG
    Png,
    /// JPEG (lossy, RGB)
    Jpeg,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "PNG"),
            Self::Jpeg => write!(f, "JPG"),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,
    /// Port to bind to (0 = ephemeral)
    pub port: u16,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Engine and model loading configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Inference backend
    pub backend: BackendType,
    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,
    /// GPU device ordinal used by the CUDA provider
    pub device_id: i32,
    /// Root directory holding `realesrgan/weights` and `gfpgan/weights`
    pub model_dir: PathBuf,
    /// Tile edge in input pixels for super-resolution (0 = no tiling)
    pub tile: u32,
    /// Overlap added around each tile
    pub tile_pad: u32,
    /// Reflect padding applied to the bottom/right edge before inference
    pub pre_pad: u32,
    /// Magnification applied by the face-aware path
    pub face_upscale: u32,
    /// Minimum face detector confidence
    pub detection_threshold: f32,
    /// IoU threshold for non-maximum suppression of face boxes
    pub nms_threshold: f32,
    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,
    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            execution_provider: ExecutionProvider::default(),
            device_id: 0,
            model_dir: PathBuf::from("."),
            tile: 400,
            tile_pad: 10,
            pre_pad: 0,
            face_upscale: 4,
            detection_threshold: 0.7,
            nms_threshold: 0.3,
            intra_threads: 0,
            inter_threads: 0,
        }
    }
}

/// Encoder parameters for the produced artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality (0-100)
    pub jpeg_quality: u8,
    /// PNG compression level (0-9)
    pub png_compression: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            png_compression: 3,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
}

impl ServiceConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::{ServiceConfig, ExecutionProvider};
    ///
    /// let config = ServiceConfig::builder()
    ///     .port(9000)
    ///     .execution_provider(ExecutionProvider::Cpu)
    ///     .tile(256)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.server.port, 9000);
    /// ```
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid JSON for this schema
    /// - Resulting configuration fails validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            UpscaleError::invalid_config(format!(
                "Failed to parse config file '{}': {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - JPEG quality: 0-100
    /// - PNG compression: 0-9
    /// - `tile_pad` smaller than `tile` when tiling is enabled
    /// - Face upscale: 1-8
    /// - Detector thresholds in (0, 1]
    /// - Upload cap greater than zero
    pub fn validate(&self) -> Result<()> {
        if self.output.jpeg_quality > 100 {
            return Err(UpscaleError::config_value_error(
                "JPEG quality",
                self.output.jpeg_quality,
                "0-100",
                Some(95),
            ));
        }

        if self.output.png_compression > 9 {
            return Err(UpscaleError::config_value_error(
                "PNG compression",
                self.output.png_compression,
                "0-9",
                Some(3),
            ));
        }

        let engine = &self.engine;
        if engine.tile > 0 && engine.tile_pad >= engine.tile {
            return Err(UpscaleError::invalid_config(format!(
                "tile_pad ({}) must be smaller than tile ({})",
                engine.tile_pad, engine.tile
            )));
        }

        if !(1..=8).contains(&engine.face_upscale) {
            return Err(UpscaleError::config_value_error(
                "face upscale",
                engine.face_upscale,
                "1-8",
                Some(4),
            ));
        }

        for (name, value) in [
            ("detection threshold", engine.detection_threshold),
            ("NMS threshold", engine.nms_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(UpscaleError::config_value_error(name, value, "(0, 1]", None));
            }
        }

        if self.server.max_upload_bytes == 0 {
            return Err(UpscaleError::invalid_config(
                "max_upload_bytes must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Builder for `ServiceConfig`
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from disk)
    #[must_use]
    pub fn from_config(config: ServiceConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set the request body cap in bytes
    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.server.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.config.engine.backend = backend;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.engine.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: i32) -> Self {
        self.config.engine.device_id = device_id;
        self
    }

    #[must_use]
    pub fn model_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.engine.model_dir = dir.into();
        self
    }

    #[must_use]
    pub fn tile(mut self, tile: u32) -> Self {
        self.config.engine.tile = tile;
        self
    }

    #[must_use]
    pub fn tile_pad(mut self, tile_pad: u32) -> Self {
        self.config.engine.tile_pad = tile_pad;
        self
    }

    #[must_use]
    pub fn pre_pad(mut self, pre_pad: u32) -> Self {
        self.config.engine.pre_pad = pre_pad;
        self
    }

    #[must_use]
    pub fn face_upscale(mut self, upscale: u32) -> Self {
        self.config.engine.face_upscale = upscale;
        self
    }

    /// Set both intra and inter threads (inter = threads/2, minimum 1; 0 = auto)
    #[must_use]
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.engine.intra_threads = threads;
        self.config.engine.inter_threads = if threads > 0 { (threads / 2).max(1) } else { 0 };
        self
    }

    /// Set JPEG quality (clamped to 100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.output.jpeg_quality = quality.min(100);
        self
    }

    /// Set PNG compression level (clamped to 9)
    #[must_use]
    pub fn png_compression(mut self, level: u8) -> Self {
        self.config.output.png_compression = level.min(9);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServiceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
