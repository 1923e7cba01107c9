//! Service layer for the upscaling pipeline
//!
//! This module contains service classes that separate codec, resampling and
//! policy concerns from the request orchestration.

pub mod format;
pub mod io;
pub mod policy;
pub mod resize;

pub use format::{EncodeParams, FormatPolicy, OutputFormatHandler};
pub use io::ImageCodec;
pub use policy::ResizePolicy;
pub use resize::{AspectResizer, Interpolation, ResizeTarget};
