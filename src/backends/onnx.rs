//! ONNX Runtime backend implementation for the enhancement models
//!
//! Wraps an `ort` session behind the `ModelSession` trait with support for
//! multiple execution providers (CPU, CUDA, `CoreML`).

use crate::config::{EngineConfig, ExecutionProvider};
use crate::error::{Result, UpscaleError};
use crate::inference::ModelSession;
use instant::Instant;
use log;
use ndarray::{Array4, ArrayD};
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::Path;
use std::sync::Mutex;

/// ONNX Runtime session for one model file
///
/// `ort` needs `&mut Session` to run, so calls are serialized through a mutex.
#[derive(Debug)]
pub struct OnnxSession {
    name: String,
    session: Mutex<Session>,
}

impl OnnxSession {
    /// List all ONNX Runtime execution providers with availability status and descriptions
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::backends::OnnxSession;
    ///
    /// let providers = OnnxSession::list_providers();
    /// for (name, available, description) in providers {
    ///     println!("{}: {} - {}", name, if available { "✅" } else { "❌" }, description);
    /// }
    /// ```
    pub fn list_providers() -> Vec<(String, bool, String)> {
        log::debug!("🔍 System Hardware Analysis:");
        log::debug!("  - Platform: {os}", os = std::env::consts::OS);
        log::debug!("  - Architecture: {arch}", arch = std::env::consts::ARCH);
        log::debug!(
            "  - CPU cores: {cores}",
            cores = std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(1)
        );

        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);

        if cuda_available {
            log::info!("✅ CUDA execution provider is available");
        } else {
            log::debug!("❌ CUDA execution provider is not available");
        }
        if !coreml_available {
            #[cfg(target_os = "macos")]
            log::warn!("❌ CoreML execution provider is not available on this Mac");
        }

        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, uses CPU for inference".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
            ),
            (
                "CoreML".to_string(),
                coreml_available,
                "Apple Silicon GPU acceleration (macOS only)".to_string(),
            ),
        ]
    }

    /// Load a model file and build a session on the configured provider
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - Session builder or provider registration failures
    pub fn load(name: &str, model_path: &Path, config: &EngineConfig) -> Result<Self> {
        let load_start = Instant::now();

        if !model_path.is_file() {
            return Err(UpscaleError::model_error_with_context(
                "load",
                model_path,
                "file not found",
                &["check engine.model_dir", "export the model to ONNX"],
            ));
        }

        let session_builder = Session::builder()
            .map_err(|e| UpscaleError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| UpscaleError::model(format!("Failed to set optimization level: {e}")))?;

        let providers = Self::select_providers(config);
        let session_builder = if providers.is_empty() {
            session_builder
        } else {
            session_builder
                .with_execution_providers(providers)
                .map_err(|e| {
                    UpscaleError::model(format!("Failed to set execution providers: {e}"))
                })?
        };

        let (intra_threads, inter_threads) = Self::thread_counts(config);
        let session = session_builder
            .with_intra_threads(intra_threads)
            .map_err(|e| UpscaleError::model(format!("Failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| UpscaleError::model(format!("Failed to set inter threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                UpscaleError::model_error_with_context(
                    "load",
                    model_path,
                    &e.to_string(),
                    &["verify the file is a valid ONNX export", "check opset support"],
                )
            })?;

        log::debug!("✅ ONNX Runtime session created for {name}");
        log::debug!("  - Requested provider: {:?}", config.execution_provider);
        log::debug!(
            "  - Threading: {intra_threads} intra-op threads, {inter_threads} inter-op threads"
        );
        log::info!(
            "📊 {name} loaded in {:.0}ms",
            load_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
        })
    }

    /// Providers to register, in priority order; empty means plain CPU
    fn select_providers(config: &EngineConfig) -> Vec<ExecutionProviderDispatch> {
        let cuda = CUDAExecutionProvider::default().with_device_id(config.device_id);
        let coreml = CoreMLExecutionProvider::default().with_subgraphs(true);
        let mut providers = Vec::new();

        match config.execution_provider {
            ExecutionProvider::Auto => {
                if OrtExecutionProvider::is_available(&cuda).unwrap_or(false) {
                    log::info!("🚀 CUDA execution provider is available and will be used");
                    providers.push(cuda.build());
                }
                if OrtExecutionProvider::is_available(&coreml).unwrap_or(false) {
                    log::info!("🍎 CoreML execution provider is available and will be used");
                    providers.push(coreml.build());
                }
                if providers.is_empty() {
                    log::warn!("⚠️ No hardware acceleration available, falling back to CPU");
                }
            },
            ExecutionProvider::Cpu => {
                log::info!("Using CPU execution provider");
            },
            ExecutionProvider::Cuda => {
                if OrtExecutionProvider::is_available(&cuda).unwrap_or(false) {
                    log::info!("Using CUDA execution provider (device {})", config.device_id);
                    providers.push(cuda.build());
                } else {
                    log::warn!(
                        "CUDA execution provider requested but not available, falling back to CPU"
                    );
                }
            },
            ExecutionProvider::CoreMl => {
                if OrtExecutionProvider::is_available(&coreml).unwrap_or(false) {
                    log::info!("🍎 Using CoreML execution provider (explicitly requested)");
                    providers.push(coreml.build());
                } else {
                    log::error!("🚫 CoreML execution provider requested but not available!");
                    log::error!("  - Falling back to CPU (will be much slower)");
                }
            },
        }

        providers
    }

    /// Resolve 0 (auto) thread counts from the host's parallelism
    fn thread_counts(config: &EngineConfig) -> (usize, usize) {
        let cores = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(8);
        let intra = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            cores
        };
        let inter = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (cores / 4).max(1)
        };
        (intra, inter)
    }
}

impl ModelSession for OnnxSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        let inference_start = Instant::now();
        let input_shape = input.dim();
        log::debug!("🚀 {} inference, input shape: {:?}", self.name, input_shape);

        let input_value = Value::from_array(input).map_err(|e| {
            UpscaleError::inference(format!("{}: failed to convert input tensor: {e}", self.name))
        })?;

        let mut session = self.session.lock().map_err(|_| {
            UpscaleError::inference(format!("{}: session lock poisoned", self.name))
        })?;

        let outputs = session.run(ort::inputs![input_value]).map_err(|e| {
            UpscaleError::inference(format!("{}: ONNX inference failed: {e}", self.name))
        })?;

        let keys: Vec<String> = outputs.keys().map(ToString::to_string).collect();
        let mut tensors = Vec::with_capacity(keys.len());
        for key in &keys {
            let value = outputs.get(key.as_str()).ok_or_else(|| {
                UpscaleError::inference(format!("{}: output '{key}' not found", self.name))
            })?;
            let array = value.try_extract_array::<f32>().map_err(|e| {
                UpscaleError::inference(format!(
                    "{}: failed to extract output '{key}': {e}",
                    self.name
                ))
            })?;
            tensors.push(array.to_owned());
        }

        if tensors.is_empty() {
            return Err(UpscaleError::inference(format!(
                "{}: no output tensors found",
                self.name
            )));
        }

        log::debug!(
            "  ⚡ {} inference complete: {:.2}ms",
            self.name,
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(tensors)
    }
}
