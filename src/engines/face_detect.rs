//! Face detection for the face-aware path
//!
//! Uses the UltraFace RFB-640 detector: a fixed 640x480 input and two
//! outputs, class scores `[1, N, 2]` and corner boxes `[1, N, 4]` in
//! normalized coordinates.

use crate::{
    engines::image_to_tensor,
    error::{Result, UpscaleError},
    inference::SharedSession,
    services::resize::{resample, Interpolation},
};
use image::RgbImage;
use ndarray::{ArrayD, Ix3};

/// Detector input width
pub const DETECTOR_WIDTH: u32 = 640;
/// Detector input height
pub const DETECTOR_HEIGHT: u32 = 480;

/// One detected face in source pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl FaceBox {
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Intersection over union
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Locates faces in a frame
pub trait FaceDetector: Send + Sync {
    /// # Errors
    /// - `UpscaleError::Inference` on detector failure
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>>;
}

/// UltraFace over a [`ModelSession`](crate::inference::ModelSession)
pub struct UltraFaceDetector {
    session: SharedSession,
    score_threshold: f32,
    iou_threshold: f32,
}

impl UltraFaceDetector {
    #[must_use]
    pub fn new(session: SharedSession, score_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            session,
            score_threshold,
            iou_threshold,
        }
    }

    /// Split graph outputs into (scores, boxes) by their trailing dimension
    fn split_outputs(outputs: Vec<ArrayD<f32>>) -> Result<(ArrayD<f32>, ArrayD<f32>)> {
        let mut scores = None;
        let mut boxes = None;
        for output in outputs {
            match output.shape().last() {
                Some(2) if output.ndim() == 3 => scores = Some(output),
                Some(4) if output.ndim() == 3 => boxes = Some(output),
                _ => {},
            }
        }
        match (scores, boxes) {
            (Some(s), Some(b)) => Ok((s, b)),
            _ => Err(UpscaleError::inference(
                "face detector must return scores [1, N, 2] and boxes [1, N, 4]",
            )),
        }
    }
}

impl FaceDetector for UltraFaceDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        let (width, height) = image.dimensions();
        let resized = resample(
            image,
            DETECTOR_WIDTH,
            DETECTOR_HEIGHT,
            Interpolation::for_widths(width, DETECTOR_WIDTH),
        )
        .map_err(|e| UpscaleError::inference_stage_error("UltraFace", "resize", &e.to_string()))?;

        let input = image_to_tensor(&resized, |v| (f32::from(v) - 127.0) / 128.0);
        let outputs = self
            .session
            .run(input)
            .map_err(|e| UpscaleError::inference_stage_error("UltraFace", "detect", &e.to_string()))?;
        let (scores, boxes) = Self::split_outputs(outputs)?;

        let scores = scores
            .into_dimensionality::<Ix3>()
            .map_err(|e| UpscaleError::inference(format!("face scores: {e}")))?;
        let boxes = boxes
            .into_dimensionality::<Ix3>()
            .map_err(|e| UpscaleError::inference(format!("face boxes: {e}")))?;
        if scores.dim().1 != boxes.dim().1 {
            return Err(UpscaleError::inference(format!(
                "face detector returned {} scores for {} boxes",
                scores.dim().1,
                boxes.dim().1
            )));
        }

        let (w, h) = (width as f32, height as f32);
        let candidates: Vec<FaceBox> = (0..scores.dim().1)
            .filter(|&i| scores[[0, i, 1]] > self.score_threshold)
            .map(|i| FaceBox {
                x1: (boxes[[0, i, 0]] * w).clamp(0.0, w),
                y1: (boxes[[0, i, 1]] * h).clamp(0.0, h),
                x2: (boxes[[0, i, 2]] * w).clamp(0.0, w),
                y2: (boxes[[0, i, 3]] * h).clamp(0.0, h),
                score: scores[[0, i, 1]],
            })
            .filter(|face| face.area() > 0.0)
            .collect();

        let faces = non_max_suppression(candidates, self.iou_threshold);
        log::debug!("UltraFace: {} face(s) in {width}x{height}", faces.len());
        Ok(faces)
    }
}

/// Greedy NMS: keep the best box, drop any overlapping it above `iou_threshold`
#[must_use]
pub fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<FaceBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// The face whose centre is closest to the image centre
#[must_use]
pub fn center_face(faces: &[FaceBox], width: u32, height: u32) -> Option<FaceBox> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    faces.iter().copied().min_by(|a, b| {
        let distance = |f: &FaceBox| {
            let (fx, fy) = f.center();
            (fx - cx).powi(2) + (fy - cy).powi(2)
        };
        distance(a).total_cmp(&distance(b))
    })
}
