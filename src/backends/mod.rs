//! Backend implementations for different inference engines
//!
//! This module provides the tensor runtimes the engines run on:
//! - ONNX Runtime backend (high performance, GPU acceleration)
//! - Tract backend (pure Rust, no external dependencies)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "tract")]
pub mod tract;

// Test utilities for engine testing
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxSession;

#[cfg(feature = "tract")]
pub use self::tract::TractSession;

use crate::{
    config::{BackendType, EngineConfig},
    error::Result,
    inference::SharedSession,
};
use std::path::Path;

/// Build a session for one model file on the configured backend
///
/// # Errors
/// - The requested backend was not compiled in
/// - The runtime failed to load the model
pub fn create_session(
    name: &str,
    model_path: &Path,
    config: &EngineConfig,
) -> Result<SharedSession> {
    match config.backend {
        BackendType::Onnx => {
            #[cfg(feature = "onnx")]
            {
                Ok(std::sync::Arc::new(OnnxSession::load(name, model_path, config)?))
            }
            #[cfg(not(feature = "onnx"))]
            {
                let _ = (name, model_path);
                Err(crate::error::UpscaleError::invalid_config(
                    "ONNX backend not compiled in (enable the 'onnx' feature)",
                ))
            }
        },
        BackendType::Tract => {
            #[cfg(feature = "tract")]
            {
                Ok(std::sync::Arc::new(TractSession::load(name, model_path, config)?))
            }
            #[cfg(not(feature = "tract"))]
            {
                let _ = (name, model_path);
                Err(crate::error::UpscaleError::invalid_config(
                    "Tract backend not compiled in (enable the 'tract' feature)",
                ))
            }
        },
    }
}

/// Execution providers for the configured backend: (name, available, description)
#[must_use]
pub fn list_providers(backend: BackendType) -> Vec<(String, bool, String)> {
    match backend {
        #[cfg(feature = "onnx")]
        BackendType::Onnx => OnnxSession::list_providers(),
        #[cfg(feature = "tract")]
        BackendType::Tract => TractSession::list_providers(),
        #[allow(unreachable_patterns)]
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_create_session_missing_model_fails() {
        for backend in [BackendType::Onnx, BackendType::Tract] {
            let config = EngineConfig {
                backend,
                ..EngineConfig::default()
            };
            let result = create_session(
                "missing",
                &PathBuf::from("/nonexistent/model.onnx"),
                &config,
            );
            assert!(result.is_err(), "{backend} should fail on a missing model");
        }
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_tract_lists_cpu_provider() {
        let providers = list_providers(BackendType::Tract);
        assert!(providers.iter().any(|(name, available, _)| name == "CPU" && *available));
    }
}
