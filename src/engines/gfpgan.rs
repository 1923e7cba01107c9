//! GFPGAN face restorer
//!
//! Detects faces, restores each 512x512 crop with the GFPGAN graph and
//! blends the results back onto a background upscaled by the wrapped
//! [`BackgroundUpscaler`].

use crate::{
    engines::{
        face_detect::center_face, image_to_tensor, tensor_to_image, BackgroundUpscaler, FaceBox,
        FaceDetector, FaceEnhanceOptions, FaceEnhanceOutput, FaceRestorer,
    },
    error::{Result, UpscaleError},
    inference::{run_single, SharedSession},
    services::resize::{resample, Interpolation},
};
use image::{imageops, Rgb, RgbImage};
use instant::Instant;
use std::sync::Arc;

/// Edge of the square face crop the restorer consumes and produces
pub const FACE_SIZE: u32 = 512;

/// Crop side relative to the longer side of the detected box
const CROP_MARGIN: f32 = 1.5;

const ENGINE: &str = "GFPGAN";

/// Region of the source frame a face was cropped from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropBox {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl CropBox {
    /// Square around the face with a margin, clamped to the frame
    fn around(face: &FaceBox, frame_width: u32, frame_height: u32) -> Option<Self> {
        let (cx, cy) = face.center();
        let half = face.width().max(face.height()) * CROP_MARGIN / 2.0;

        let x0 = (cx - half).floor().max(0.0) as u32;
        let y0 = (cy - half).floor().max(0.0) as u32;
        let x1 = ((cx + half).ceil() as u32).min(frame_width);
        let y1 = ((cy + half).ceil() as u32).min(frame_height);

        (x1 > x0 && y1 > y0).then_some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Face-aware enhancement over a [`ModelSession`](crate::inference::ModelSession)
pub struct GfpganRestorer {
    session: SharedSession,
    detector: Box<dyn FaceDetector>,
    bg_upsampler: Option<Arc<dyn BackgroundUpscaler>>,
    upscale: u32,
}

impl GfpganRestorer {
    /// Restorer without a background upsampler; the background is Lanczos-resampled
    #[must_use]
    pub fn new(session: SharedSession, detector: Box<dyn FaceDetector>, upscale: u32) -> Self {
        Self {
            session,
            detector,
            bg_upsampler: None,
            upscale: upscale.max(1),
        }
    }

    /// Upscale the background with a super-resolution engine
    #[must_use]
    pub fn with_bg_upsampler(mut self, upsampler: Arc<dyn BackgroundUpscaler>) -> Self {
        self.bg_upsampler = Some(upsampler);
        self
    }

    #[must_use]
    pub fn upscale(&self) -> u32 {
        self.upscale
    }

    /// Run GFPGAN on one 512x512 crop
    fn restore_face(&self, face: &RgbImage, stage: &str) -> Result<RgbImage> {
        let input = image_to_tensor(face, |v| (f32::from(v) / 255.0 - 0.5) / 0.5);
        let output = run_single(self.session.as_ref(), input)
            .map_err(|e| UpscaleError::inference_stage_error(ENGINE, stage, &e.to_string()))?;

        let (_, channels, height, width) = output.dim();
        if channels != 3 || height != FACE_SIZE as usize || width != FACE_SIZE as usize {
            return Err(UpscaleError::inference_stage_error(
                ENGINE,
                stage,
                &format!("expected a 512x512 RGB face, got {:?}", output.shape()),
            ));
        }

        tensor_to_image(&output, |v| (v.clamp(-1.0, 1.0) + 1.0) / 2.0 * 255.0)
    }

    /// Background at `upscale`, from the wrapped upsampler when present
    fn upsample_background(&self, image: &RgbImage) -> Result<RgbImage> {
        let target_w = image.width() * self.upscale;
        let target_h = image.height() * self.upscale;

        let background = match &self.bg_upsampler {
            Some(upsampler) => upsampler.enhance(image, self.upscale as f32)?.0,
            None => resample(image, target_w, target_h, Interpolation::Lanczos).map_err(|e| {
                UpscaleError::inference_stage_error(ENGINE, "background", &e.to_string())
            })?,
        };

        if background.dimensions() == (target_w, target_h) {
            return Ok(background);
        }
        resample(
            &background,
            target_w,
            target_h,
            Interpolation::for_widths(background.width(), target_w),
        )
        .map_err(|e| UpscaleError::inference_stage_error(ENGINE, "background", &e.to_string()))
    }

    /// Blend a restored face into its box with a feathered edge
    fn paste_face(&self, background: &mut RgbImage, face: &RgbImage, crop: CropBox) -> Result<()> {
        let x0 = crop.x * self.upscale;
        let y0 = crop.y * self.upscale;
        let width = (crop.width * self.upscale).min(background.width().saturating_sub(x0));
        let height = (crop.height * self.upscale).min(background.height().saturating_sub(y0));
        if width == 0 || height == 0 {
            return Ok(());
        }

        let resized = resample(
            face,
            width,
            height,
            Interpolation::for_widths(face.width(), width),
        )
        .map_err(|e| UpscaleError::inference_stage_error(ENGINE, "paste", &e.to_string()))?;

        let feather = (width.min(height) as f32 / 10.0).max(1.0);
        for (px, py, restored) in resized.enumerate_pixels() {
            let edge_distance = px.min(py).min(width - 1 - px).min(height - 1 - py) as f32;
            let alpha = ((edge_distance + 1.0) / feather).min(1.0);

            let target = background.get_pixel_mut(x0 + px, y0 + py);
            let blended = |c: usize| {
                (alpha * f32::from(restored[c]) + (1.0 - alpha) * f32::from(target[c]))
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            *target = Rgb([blended(0), blended(1), blended(2)]);
        }
        Ok(())
    }

    fn to_face_size(image: &RgbImage) -> Result<RgbImage> {
        if image.dimensions() == (FACE_SIZE, FACE_SIZE) {
            return Ok(image.clone());
        }
        resample(
            image,
            FACE_SIZE,
            FACE_SIZE,
            Interpolation::for_widths(image.width(), FACE_SIZE),
        )
        .map_err(|e| UpscaleError::inference_stage_error(ENGINE, "crop", &e.to_string()))
    }
}

impl FaceRestorer for GfpganRestorer {
    fn enhance(&self, image: &RgbImage, options: FaceEnhanceOptions) -> Result<FaceEnhanceOutput> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(UpscaleError::inference(format!(
                "{ENGINE}: cannot enhance a {width}x{height} image"
            )));
        }
        let start = Instant::now();

        if options.has_aligned {
            let face = Self::to_face_size(image)?;
            let restored = self.restore_face(&face, "aligned face")?;
            return Ok(FaceEnhanceOutput {
                cropped_faces: vec![face],
                restored_faces: vec![restored],
                restored_image: None,
            });
        }

        let mut faces = self
            .detector
            .detect(image)
            .map_err(|e| UpscaleError::inference_stage_error(ENGINE, "detect", &e.to_string()))?;
        if options.only_center_face {
            faces = center_face(&faces, width, height).into_iter().collect();
        }

        let crops: Vec<CropBox> = faces
            .iter()
            .filter_map(|face| CropBox::around(face, width, height))
            .collect();
        let total = crops.len();

        let mut output = FaceEnhanceOutput::default();
        for (index, crop) in crops.iter().enumerate() {
            let region = imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height).to_image();
            let cropped = Self::to_face_size(&region)?;
            let restored = self.restore_face(&cropped, &format!("face {}/{total}", index + 1))?;
            output.cropped_faces.push(cropped);
            output.restored_faces.push(restored);
        }

        if options.paste_back {
            let mut background = self.upsample_background(image)?;
            for (crop, restored) in crops.iter().zip(&output.restored_faces) {
                self.paste_face(&mut background, restored, *crop)?;
            }
            output.restored_image = Some(background);
        }

        log::info!(
            "{ENGINE}: restored {total} face(s) in {width}x{height} in {:.0}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(output)
    }
}
