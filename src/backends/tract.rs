//! Tract backend implementation for the enhancement models
//!
//! Tract is a pure Rust inference library with no external dependencies.
//! It runs on the CPU only and needs no runtime locking.

use crate::config::EngineConfig;
use crate::error::{Result, UpscaleError};
use crate::inference::ModelSession;
use instant::Instant;
use log;
use ndarray::{Array4, ArrayD};
use std::path::Path;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract session for one model file
#[derive(Debug)]
pub struct TractSession {
    name: String,
    model: TractModel,
}

impl TractSession {
    /// Tract only ever runs on the CPU
    pub fn list_providers() -> Vec<(String, bool, String)> {
        log::debug!("🔍 Tract Backend System Analysis:");
        log::debug!("  - Platform: {os}", os = std::env::consts::OS);
        log::debug!("  - Architecture: {arch}", arch = std::env::consts::ARCH);

        vec![(
            "CPU".to_string(),
            true,
            "Pure Rust CPU inference with no external dependencies".to_string(),
        )]
    }

    /// Load and optimize a model file
    ///
    /// # Errors
    /// - Model file missing or not a valid ONNX graph
    /// - Optimization failures (unsupported operators)
    pub fn load(name: &str, model_path: &Path, _config: &EngineConfig) -> Result<Self> {
        let load_start = Instant::now();

        if !model_path.is_file() {
            return Err(UpscaleError::model_error_with_context(
                "load",
                model_path,
                "file not found",
                &["check engine.model_dir"],
            ));
        }

        log::info!("🚀 Initializing Tract session for {name}");
        log::debug!("  - Model file: {}", model_path.display());

        let model = onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                UpscaleError::model_error_with_context("load", model_path, &e.to_string(), &[])
            })?
            .into_optimized()
            .map_err(|e| UpscaleError::model(format!("Failed to optimize {name}: {e}")))?
            .into_runnable()
            .map_err(|e| {
                UpscaleError::model(format!("Failed to create runnable model for {name}: {e}"))
            })?;

        log::info!(
            "✅ Tract session for {name} initialized in {}ms",
            load_start.elapsed().as_millis()
        );

        Ok(Self {
            name: name.to_string(),
            model,
        })
    }
}

impl ModelSession for TractSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        log::debug!("🔮 Running Tract inference for {}", self.name);
        log::debug!("  - Input tensor: {:?}", input.shape());

        let inference_start = Instant::now();
        let input_tensor = Tensor::from(input);

        let outputs = self.model.run(tvec![input_tensor.into()]).map_err(|e| {
            UpscaleError::inference(format!("{}: Tract inference failed: {e}", self.name))
        })?;

        let mut tensors = Vec::with_capacity(outputs.len());
        for output in outputs {
            let view = output.to_array_view::<f32>().map_err(|e| {
                UpscaleError::inference(format!(
                    "{}: failed to convert output tensor: {e}",
                    self.name
                ))
            })?;
            let array = ArrayD::from_shape_vec(view.shape().to_vec(), view.iter().copied().collect())
                .map_err(|e| {
                    UpscaleError::inference(format!(
                        "{}: failed to reshape output tensor: {e}",
                        self.name
                    ))
                })?;
            tensors.push(array);
        }

        if tensors.is_empty() {
            return Err(UpscaleError::inference(format!(
                "{}: no output tensor found",
                self.name
            )));
        }

        log::debug!(
            "✅ Tract inference completed in {}ms",
            inference_start.elapsed().as_millis()
        );

        Ok(tensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_tract_providers() {
        let providers = TractSession::list_providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].0, "CPU");
        assert!(providers[0].1);
    }

    #[test]
    fn test_load_missing_model() {
        let err = TractSession::load(
            "missing",
            Path::new("/nonexistent/model.onnx"),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, UpscaleError::Model(_)));
    }

    #[test]
    fn test_load_corrupt_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a protobuf graph").unwrap();
        let result = TractSession::load("corrupt", file.path(), &EngineConfig::default());
        assert!(result.is_err());
    }
}
