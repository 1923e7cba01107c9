//! Model file layout and one-time engine loading

use crate::{
    backends,
    config::EngineConfig,
    engines::{
        BackgroundUpscaler, FaceRestorer, GfpganRestorer, RealEsrganUpscaler, TileConfig,
        UltraFaceDetector,
    },
    error::{Result, UpscaleError},
};
use instant::Instant;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Super-resolution weights, relative to the model directory
pub const REALESRGAN_MODEL: &str = "realesrgan/weights/RealESRGAN_x4plus.onnx";
/// Face restoration weights, relative to the model directory
pub const GFPGAN_MODEL: &str = "gfpgan/weights/GFPGANv1.3.onnx";
/// Face detector weights, relative to the model directory
pub const FACE_DETECTOR_MODEL: &str = "gfpgan/weights/face_detection_ultraface_640.onnx";

/// Resolved paths of every model file the service needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub realesrgan: PathBuf,
    pub gfpgan: PathBuf,
    pub face_detector: PathBuf,
}

impl ModelPaths {
    /// Standard layout under `model_dir`
    #[must_use]
    pub fn under<P: AsRef<Path>>(model_dir: P) -> Self {
        let dir = model_dir.as_ref();
        Self {
            realesrgan: dir.join(REALESRGAN_MODEL),
            gfpgan: dir.join(GFPGAN_MODEL),
            face_detector: dir.join(FACE_DETECTOR_MODEL),
        }
    }

    /// Check each file exists, is a regular file and is non-empty
    ///
    /// # Errors
    /// - `UpscaleError::Model` naming the first offending file
    pub fn validate(&self) -> Result<()> {
        for path in [&self.realesrgan, &self.gfpgan, &self.face_detector] {
            Self::validate_file(path)?;
        }
        Ok(())
    }

    fn validate_file(path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            UpscaleError::model_error_with_context(
                "find",
                path,
                &e.to_string(),
                &["check engine.model_dir", "export the weights to ONNX"],
            )
        })?;

        if !metadata.is_file() {
            return Err(UpscaleError::model_error_with_context(
                "read",
                path,
                "not a regular file",
                &[],
            ));
        }
        if metadata.len() == 0 {
            return Err(UpscaleError::model_error_with_context(
                "read",
                path,
                "file is empty",
                &["re-export or re-download the weights"],
            ));
        }
        Ok(())
    }
}

/// The two enhancement engines, built once and shared
#[derive(Clone)]
pub struct Engines {
    pub upscaler: Arc<dyn BackgroundUpscaler>,
    pub face_restorer: Arc<dyn FaceRestorer>,
}

/// Engine availability, fixed for the life of the process
#[derive(Clone)]
pub enum EngineState {
    Ready(Engines),
    Unavailable { reason: String },
}

impl EngineState {
    #[must_use]
    pub fn ready(
        upscaler: Arc<dyn BackgroundUpscaler>,
        face_restorer: Arc<dyn FaceRestorer>,
    ) -> Self {
        Self::Ready(Engines {
            upscaler,
            face_restorer,
        })
    }

    #[must_use]
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The engines, or `ServiceNotReady`
    ///
    /// # Errors
    /// - `UpscaleError::ServiceNotReady` when loading failed at startup
    pub fn engines(&self) -> Result<&Engines> {
        match self {
            Self::Ready(engines) => Ok(engines),
            Self::Unavailable { .. } => Err(UpscaleError::ServiceNotReady),
        }
    }
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Ready"),
            Self::Unavailable { reason } => {
                f.debug_struct("Unavailable").field("reason", reason).finish()
            },
        }
    }
}

/// Loads the engines from disk
pub struct ModelRegistry;

impl ModelRegistry {
    /// Load both engines; any failure yields `Unavailable` instead of an error
    #[must_use]
    pub fn load(config: &EngineConfig) -> EngineState {
        match Self::try_load(config) {
            Ok(engines) => EngineState::Ready(engines),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load AI models; the service will report not ready");
                EngineState::unavailable(e.to_string())
            },
        }
    }

    /// Load both engines, propagating the first failure
    ///
    /// # Errors
    /// - Missing, empty or unreadable model files
    /// - Backend session creation failures
    pub fn try_load(config: &EngineConfig) -> Result<Engines> {
        let start = Instant::now();
        let paths = ModelPaths::under(&config.model_dir);
        paths.validate()?;

        tracing::info!(
            backend = %config.backend,
            provider = %config.execution_provider,
            model_dir = %config.model_dir.display(),
            "Loading enhancement models"
        );

        let sr_session = backends::create_session("Real-ESRGAN", &paths.realesrgan, config)?;
        let upscaler: Arc<dyn BackgroundUpscaler> =
            Arc::new(RealEsrganUpscaler::new(sr_session, TileConfig::from(config)));

        let detector_session =
            backends::create_session("UltraFace", &paths.face_detector, config)?;
        let detector = UltraFaceDetector::new(
            detector_session,
            config.detection_threshold,
            config.nms_threshold,
        );

        let face_session = backends::create_session("GFPGAN", &paths.gfpgan, config)?;
        let face_restorer: Arc<dyn FaceRestorer> = Arc::new(
            GfpganRestorer::new(face_session, Box::new(detector), config.face_upscale)
                .with_bg_upsampler(upscaler.clone()),
        );

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Real-ESRGAN and GFPGAN models loaded"
        );
        Ok(Engines {
            upscaler,
            face_restorer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::{MockFaceRestorer, MockUpscaler};
    use std::fs;

    fn write_models(dir: &Path, contents: &[u8]) {
        let paths = ModelPaths::under(dir);
        for path in [&paths.realesrgan, &paths.gfpgan, &paths.face_detector] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    #[test]
    fn test_standard_layout() {
        let paths = ModelPaths::under("/srv/models");
        assert_eq!(
            paths.realesrgan,
            PathBuf::from("/srv/models/realesrgan/weights/RealESRGAN_x4plus.onnx")
        );
        assert_eq!(
            paths.gfpgan,
            PathBuf::from("/srv/models/gfpgan/weights/GFPGANv1.3.onnx")
        );
        assert!(paths.face_detector.ends_with("face_detection_ultraface_640.onnx"));
    }

    #[test]
    fn test_validate_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelPaths::under(dir.path()).validate().unwrap_err();
        assert!(matches!(err, UpscaleError::Model(_)));
        assert!(err.to_string().contains("RealESRGAN_x4plus.onnx"));
    }

    #[test]
    fn test_validate_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        write_models(dir.path(), b"");
        let err = ModelPaths::under(dir.path()).validate().unwrap_err();
        assert!(err.to_string().contains("file is empty"));
    }

    #[test]
    fn test_validate_directory_instead_of_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(REALESRGAN_MODEL)).unwrap();
        let err = ModelPaths::under(dir.path()).validate().unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn test_load_missing_models_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            model_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };

        let state = ModelRegistry::load(&config);
        assert!(!state.is_ready());
        match &state {
            EngineState::Unavailable { reason } => {
                assert!(reason.contains("RealESRGAN_x4plus.onnx"));
            },
            EngineState::Ready(_) => panic!("expected Unavailable"),
        }
        assert!(matches!(
            state.engines().err(),
            Some(UpscaleError::ServiceNotReady)
        ));
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_load_corrupt_models_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_models(dir.path(), b"not an onnx graph");
        let config = EngineConfig {
            model_dir: dir.path().to_path_buf(),
            backend: crate::config::BackendType::Tract,
            ..EngineConfig::default()
        };
        assert!(!ModelRegistry::load(&config).is_ready());
    }

    #[test]
    fn test_ready_state_exposes_engines() {
        let state = EngineState::ready(
            Arc::new(MockUpscaler::new()),
            Arc::new(MockFaceRestorer::new()),
        );
        assert!(state.is_ready());
        assert!(state.engines().is_ok());
        assert_eq!(format!("{state:?}"), "Ready");
    }
}
