#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # IMG.LY Upscale
//!
//! An HTTP upscaling service built on Real-ESRGAN super-resolution and GFPGAN
//! face restoration, running on ONNX Runtime or the pure Rust Tract backend.
//!
//! A single `POST /upscale` endpoint accepts a multipart upload and returns the
//! enhanced image as an attachment. Requests pick a scale mode (`2x`, `4x`,
//! `6x`, `2k`, `4k`), an output container (`PNG`, `JPG`, `AUTO`) and whether
//! faces are restored before the frame is composited.
//!
//! ## Features
//!
//! - **Two Engines**: tiled Real-ESRGAN x4plus and GFPGAN v1.3 with face detection
//! - **Multiple Backends**: ONNX Runtime (CUDA, `CoreML`, CPU) and Tract (Pure Rust)
//! - **Resize Policy**: multiplier and fixed-edge targets that preserve aspect ratio
//! - **Format Policy**: extension-following output with a JPEG override for 4K
//! - **Fail-soft Startup**: missing weights keep the server up and report not ready
//!
//! ## Quick Start
//!
//! ### Library Usage
//!
//! ```rust,no_run
//! use imgly_upscale::{
//!     ModelRegistry, ServiceConfig, ExecutionProvider, UpscaleProcessor,
//!     types::{ScaleOption, UploadedImage, UpscaleRequest},
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::builder()
//!     .model_dir("/srv/models")
//!     .execution_provider(ExecutionProvider::Auto)
//!     .build()?;
//!
//! let state = Arc::new(ModelRegistry::load(&config.engine));
//! let processor = UpscaleProcessor::new(state, config.output.clone());
//!
//! let upload = UploadedImage::new(std::fs::read("portrait.jpg")?, "portrait.jpg");
//! let output = processor.process(&UpscaleRequest::new(upload).with_scale(ScaleOption::X2))?;
//! std::fs::write(&output.filename, &output.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Serving
//!
//! ```rust,no_run
//! use imgly_upscale::{server, ModelRegistry, ServiceConfig, UpscaleProcessor};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::default();
//! let state = Arc::new(ModelRegistry::load(&config.engine));
//! let app_state = server::AppState::new(UpscaleProcessor::new(state, config.output.clone()));
//! server::serve(&config.server, app_state).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend with GPU acceleration support
//! - `tract` (default): Pure Rust backend
//! - `webp-support` (default): WebP uploads
//! - `tracing-json`: JSON log output
//! - `tracing-files`: file and rolling-file log output
//!
//! ## Backend Selection
//!
//! ```rust,no_run
//! use imgly_upscale::{BackendType, ServiceConfig};
//!
//! # fn example() -> imgly_upscale::Result<()> {
//! let config = ServiceConfig::builder().backend(BackendType::Tract).build()?;
//! assert_eq!(config.engine.backend, BackendType::Tract);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod dispatcher;
pub mod engines;
pub mod error;
pub mod inference;
pub mod models;
pub mod processor;
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;

pub use config::{
    BackendType, EngineConfig, ExecutionProvider, OutputConfig, OutputFormat, ServerConfig,
    ServiceConfig, ServiceConfigBuilder,
};
pub use dispatcher::{EnhancementDispatcher, EnhancementStrategy};
pub use engines::{
    BackgroundUpscaler, FaceEnhanceOptions, FaceEnhanceOutput, FaceRestorer, UpscaleInfo,
};
pub use error::{Result, UpscaleError};
pub use inference::{ModelSession, SharedSession};
pub use models::{EngineState, Engines, ModelPaths, ModelRegistry};
pub use processor::UpscaleProcessor;
pub use services::{
    AspectResizer, EncodeParams, FormatPolicy, ImageCodec, Interpolation, OutputFormatHandler,
    ResizePolicy, ResizeTarget,
};
pub use tracing_config::{TracingConfig, TracingFormat, TracingGuard, TracingOutput};
pub use types::{
    Dimensions, FormatRequest, Orientation, ProcessingTimings, ScaleOption, UploadedImage,
    UpscaleOutput, UpscaleRequest,
};
