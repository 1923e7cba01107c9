//! Shared fixtures for the integration tests: mock engines, model sessions,
//! encoded test images and a hand-built multipart body.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use image::{imageops, Rgb, RgbImage};
use imgly_upscale::{
    engines::{FaceBox, FaceDetector},
    server::{self, AppState},
    BackgroundUpscaler, EncodeParams, EngineState, FaceEnhanceOptions, FaceEnhanceOutput,
    FaceRestorer, ImageCodec, ModelSession, OutputConfig, Result, UpscaleError, UpscaleInfo,
    UpscaleProcessor,
};
use ndarray::{Array4, ArrayD};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

pub const BOUNDARY: &str = "upscale-test-boundary";

/// Solid-colour image with a darker square in the middle
pub fn sample_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inner = x > width / 4 && x < width * 3 / 4 && y > height / 4 && y < height * 3 / 4;
        if inner {
            Rgb([40, 80, 120])
        } else {
            Rgb([200, 180, 160])
        }
    })
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    ImageCodec::encode(&sample_image(width, height), EncodeParams::Jpeg { quality: 90 })
        .expect("jpeg fixture")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    ImageCodec::encode(&sample_image(width, height), EncodeParams::Png { compression: 3 })
        .expect("png fixture")
}

/// Splice an APP1 Exif segment holding one orientation tag after the SOI marker
pub fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&u32::from(orientation).to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn nearest(image: &RgbImage, factor: f32) -> RgbImage {
    let width = ((image.width() as f32 * factor) as u32).max(1);
    let height = ((image.height() as f32 * factor) as u32).max(1);
    imageops::resize(image, width, height, imageops::FilterType::Nearest)
}

/// Background upscaler that records each requested outscale
#[derive(Clone, Default)]
pub struct RecordingUpscaler {
    calls: Arc<Mutex<Vec<f32>>>,
    fail: bool,
}

impl RecordingUpscaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<f32> {
        self.calls.lock().unwrap().clone()
    }
}

impl BackgroundUpscaler for RecordingUpscaler {
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<(RgbImage, UpscaleInfo)> {
        self.calls.lock().unwrap().push(outscale);
        if self.fail {
            return Err(UpscaleError::inference("simulated out of memory"));
        }
        Ok((
            nearest(image, outscale),
            UpscaleInfo {
                model_scale: 4,
                outscale,
                tiles: 1,
            },
        ))
    }
}

/// Face restorer that records its options and returns a 4x composite
#[derive(Clone, Default)]
pub struct RecordingRestorer {
    calls: Arc<Mutex<Vec<FaceEnhanceOptions>>>,
}

impl RecordingRestorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FaceEnhanceOptions> {
        self.calls.lock().unwrap().clone()
    }
}

impl FaceRestorer for RecordingRestorer {
    fn enhance(&self, image: &RgbImage, options: FaceEnhanceOptions) -> Result<FaceEnhanceOutput> {
        self.calls.lock().unwrap().push(options);
        Ok(FaceEnhanceOutput {
            restored_image: Some(nearest(image, 4.0)),
            ..FaceEnhanceOutput::default()
        })
    }
}

/// Model session that repeats each input pixel `scale` times per axis
pub struct NearestSession {
    scale: usize,
    calls: AtomicUsize,
}

impl NearestSession {
    pub fn new(scale: usize) -> Self {
        Self {
            scale,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelSession for NearestSession {
    fn name(&self) -> &str {
        "nearest"
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (n, c, h, w) = input.dim();
        let s = self.scale;
        let output = Array4::from_shape_fn((n, c, h * s, w * s), |(b, ch, y, x)| {
            input[[b, ch, y / s, x / s]]
        });
        Ok(vec![output.into_dyn()])
    }
}

/// Model session returning a mid-grey tensor shaped like its input
pub struct FlatSession;

impl ModelSession for FlatSession {
    fn name(&self) -> &str {
        "flat"
    }

    fn run(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![Array4::<f32>::zeros(input.dim()).into_dyn()])
    }
}

/// Detector returning a fixed list of boxes
pub struct FixedDetector(pub Vec<FaceBox>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceBox>> {
        Ok(self.0.clone())
    }
}

pub fn ready_state(upscaler: &RecordingUpscaler, restorer: &RecordingRestorer) -> Arc<EngineState> {
    Arc::new(EngineState::ready(
        Arc::new(upscaler.clone()),
        Arc::new(restorer.clone()),
    ))
}

pub fn app(state: Arc<EngineState>) -> Router {
    app_with_limit(state, imgly_upscale::config::DEFAULT_MAX_UPLOAD_BYTES)
}

pub fn app_with_limit(state: Arc<EngineState>, max_upload_bytes: usize) -> Router {
    let processor = UpscaleProcessor::new(state, OutputConfig::default());
    server::router(AppState::new(processor), max_upload_bytes)
}

/// Builder for a `multipart/form-data` body
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/upscale")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}
