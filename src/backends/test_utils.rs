//! Test utilities and mock sessions for testing engine functionality
//!
//! This module provides mock implementations of `ModelSession` and of the
//! engine traits so the pipeline can be tested without model files or
//! external runtimes.

use crate::{
    engines::{
        BackgroundUpscaler, FaceBox, FaceDetector, FaceEnhanceOptions, FaceEnhanceOutput,
        FaceRestorer, UpscaleInfo,
    },
    error::{Result, UpscaleError},
    inference::ModelSession,
};
use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::{Array4, ArrayD};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

/// Nearest-neighbour upscaler standing in for a super-resolution graph
#[derive(Debug)]
pub struct NearestUpscaleSession {
    scale: usize,
    calls: AtomicUsize,
    input_shapes: Mutex<Vec<(usize, usize, usize, usize)>>,
}

impl NearestUpscaleSession {
    #[must_use]
    pub fn new(scale: usize) -> Self {
        Self {
            scale,
            calls: AtomicUsize::new(0),
            input_shapes: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn input_shapes(&self) -> Vec<(usize, usize, usize, usize)> {
        self.input_shapes.lock().unwrap().clone()
    }
}

impl ModelSession for NearestUpscaleSession {
    fn name(&self) -> &str {
        "mock-nearest"
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut shapes) = self.input_shapes.lock() {
            shapes.push(input.dim());
        }

        let (n, c, h, w) = input.dim();
        let s = self.scale;
        let output = Array4::from_shape_fn((n, c, h * s, w * s), |(b, ch, y, x)| {
            input[[b, ch, y / s, x / s]]
        });
        Ok(vec![output.into_dyn()])
    }
}

/// Returns a tensor shaped like the input, filled with one value
#[derive(Debug)]
pub struct ConstantSession {
    value: f32,
    calls: AtomicUsize,
}

impl ConstantSession {
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self {
            value,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelSession for ConstantSession {
    fn name(&self) -> &str {
        "mock-constant"
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Array4::from_elem(input.dim(), self.value).into_dyn()])
    }
}

/// Returns the same prepared outputs on every call
#[derive(Debug)]
pub struct FixedOutputsSession {
    outputs: Vec<ArrayD<f32>>,
}

impl FixedOutputsSession {
    #[must_use]
    pub fn new(outputs: Vec<ArrayD<f32>>) -> Self {
        Self { outputs }
    }
}

impl ModelSession for FixedOutputsSession {
    fn name(&self) -> &str {
        "mock-fixed"
    }

    fn run(&self, _input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        Ok(self.outputs.clone())
    }
}

/// Always fails with an inference error
#[derive(Debug)]
pub struct FailingSession {
    message: String,
}

impl FailingSession {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl ModelSession for FailingSession {
    fn name(&self) -> &str {
        "mock-failing"
    }

    fn run(&self, _input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        Err(UpscaleError::inference(self.message.clone()))
    }
}

/// Detector that reports a fixed set of boxes
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    pub faces: Vec<FaceBox>,
}

impl FaceDetector for FixedDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceBox>> {
        Ok(self.faces.clone())
    }
}

/// Background upscaler that resamples with a nearest filter and records calls
#[derive(Debug, Clone, Default)]
pub struct MockUpscaler {
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl MockUpscaler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }
}

impl BackgroundUpscaler for MockUpscaler {
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<(RgbImage, UpscaleInfo)> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(format!("enhance:{outscale}"));
        }
        if self.should_fail {
            return Err(UpscaleError::inference("mock upscaler failed"));
        }

        let width = (image.width() as f32 * outscale) as u32;
        let height = (image.height() as f32 * outscale) as u32;
        let output = image::imageops::resize(image, width, height, FilterType::Nearest);
        Ok((
            output,
            UpscaleInfo {
                model_scale: 4,
                outscale,
                tiles: 1,
            },
        ))
    }
}

/// Face restorer returning a solid frame at 4x, or nothing when asked to
#[derive(Debug, Clone, Default)]
pub struct MockFaceRestorer {
    call_history: Arc<Mutex<Vec<FaceEnhanceOptions>>>,
    omit_composite: bool,
}

impl MockFaceRestorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restorer whose output carries no composited frame
    #[must_use]
    pub fn without_composite() -> Self {
        Self {
            omit_composite: true,
            ..Self::default()
        }
    }

    pub fn get_call_history(&self) -> Vec<FaceEnhanceOptions> {
        self.call_history.lock().unwrap().clone()
    }
}

impl FaceRestorer for MockFaceRestorer {
    fn enhance(&self, image: &RgbImage, options: FaceEnhanceOptions) -> Result<FaceEnhanceOutput> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(options);
        }

        let restored_image = (!self.omit_composite)
            .then(|| RgbImage::from_pixel(image.width() * 4, image.height() * 4, Rgb([9, 9, 9])));
        Ok(FaceEnhanceOutput {
            cropped_faces: Vec::new(),
            restored_faces: Vec::new(),
            restored_image,
        })
    }
}
