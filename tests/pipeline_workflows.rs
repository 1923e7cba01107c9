//! Library-level workflows: the processor driving real engines over
//! deterministic model sessions

mod common;

use common::{png_bytes, sample_image, FixedDetector, FlatSession, NearestSession};
use imgly_upscale::{
    engines::{FaceBox, GfpganRestorer, RealEsrganUpscaler, TileConfig},
    BackgroundUpscaler, EngineState, FaceEnhanceOptions, FaceRestorer, FormatRequest, ImageCodec,
    OutputConfig, OutputFormat, ScaleOption, UploadedImage, UpscaleProcessor, UpscaleRequest,
};
use std::sync::Arc;

fn tiled_upscaler(session: Arc<NearestSession>) -> Arc<RealEsrganUpscaler> {
    Arc::new(RealEsrganUpscaler::new(
        session,
        TileConfig {
            tile: 16,
            tile_pad: 2,
            pre_pad: 0,
        },
    ))
}

fn face_restorer(upscaler: Arc<RealEsrganUpscaler>, faces: Vec<FaceBox>) -> GfpganRestorer {
    GfpganRestorer::new(Arc::new(FlatSession), Box::new(FixedDetector(faces)), 4)
        .with_bg_upsampler(upscaler)
}

fn centre_face() -> FaceBox {
    FaceBox {
        x1: 24.0,
        y1: 16.0,
        x2: 40.0,
        y2: 32.0,
        score: 0.95,
    }
}

#[test]
fn test_tiled_background_matches_nearest_upscale() {
    let session = Arc::new(NearestSession::new(4));
    let upscaler = tiled_upscaler(session.clone());
    let image = sample_image(40, 24);

    let (output, info) = upscaler.enhance(&image, 4.0).unwrap();
    assert_eq!(output.dimensions(), (160, 96));
    assert_eq!(info.model_scale, 4);
    // 3 x 2 tiles of 16px
    assert_eq!(info.tiles, 6);
    assert_eq!(session.call_count(), 6);

    for (x, y, pixel) in output.enumerate_pixels() {
        assert_eq!(pixel, image.get_pixel(x / 4, y / 4), "pixel ({x}, {y})");
    }
}

#[test]
fn test_face_restoration_composites_onto_background() {
    let upscaler = tiled_upscaler(Arc::new(NearestSession::new(4)));
    let restorer = face_restorer(upscaler, vec![centre_face()]);
    let image = sample_image(64, 48);

    let output = restorer
        .enhance(&image, FaceEnhanceOptions::default())
        .unwrap();
    assert_eq!(output.cropped_faces.len(), 1);
    assert_eq!(output.restored_faces.len(), 1);
    assert_eq!(output.restored_faces[0].dimensions(), (512, 512));

    let composite = output.restored_image.unwrap();
    assert_eq!(composite.dimensions(), (256, 192));
    // Corners are far from the face and keep the background colour
    assert_eq!(composite.get_pixel(0, 0), image.get_pixel(0, 0));
    assert_eq!(composite.get_pixel(255, 191), image.get_pixel(63, 47));
}

#[test]
fn test_processor_face_aware_2x_landscape() {
    let upscaler = tiled_upscaler(Arc::new(NearestSession::new(4)));
    let restorer = face_restorer(upscaler.clone(), vec![centre_face()]);
    let state = Arc::new(EngineState::ready(upscaler, Arc::new(restorer)));
    let processor = UpscaleProcessor::new(state, OutputConfig::default());

    let request = UpscaleRequest::new(UploadedImage::new(png_bytes(64, 48), "group.png"))
        .with_scale(ScaleOption::X2);
    let output = processor.process(&request).unwrap();

    assert_eq!(output.format, OutputFormat::Png);
    assert_eq!(output.filename, "group_out.png");
    assert_eq!(output.output.width, 128);
    assert_eq!(output.output.height, 96);
    assert!(output.timings.total_ms >= output.timings.enhance_ms);

    let decoded = ImageCodec::decode(&output.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (128, 96));
}

#[test]
fn test_processor_background_only_2k_portrait() {
    let session = Arc::new(NearestSession::new(4));
    let upscaler = tiled_upscaler(session.clone());
    let restorer = face_restorer(upscaler.clone(), Vec::new());
    let state = Arc::new(EngineState::ready(upscaler, Arc::new(restorer)));
    let processor = UpscaleProcessor::new(state, OutputConfig::default());

    let request = UpscaleRequest::new(UploadedImage::new(png_bytes(24, 32), "tall.jpeg"))
        .with_scale(ScaleOption::K2)
        .with_format(FormatRequest::Auto)
        .with_face_enhance(false);
    let output = processor.process(&request).unwrap();

    assert_eq!(output.format, OutputFormat::Jpeg);
    assert_eq!(output.filename, "tall_out.jpg");
    assert_eq!(output.output.height, 2048);
    assert_eq!(output.output.width, 1536);
    assert!(session.call_count() > 0);
}
