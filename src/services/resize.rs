//! Aspect-preserving resize service
//!
//! One axis is given, the other is derived from the aspect ratio. Shrinking
//! uses area averaging, enlarging uses Lanczos.

use crate::error::{Result, UpscaleError};
use fast_image_resize as fr;
use image::RgbImage;

/// Which axis to pin, and to what
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    Width(u32),
    Height(u32),
    /// Keep the buffer as-is
    None,
}

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Box convolution; averages source pixels when shrinking
    Area,
    /// Lanczos3
    Lanczos,
}

impl Interpolation {
    /// Area when the width shrinks, Lanczos otherwise
    #[must_use]
    pub fn for_widths(current: u32, target: u32) -> Self {
        if target < current {
            Self::Area
        } else {
            Self::Lanczos
        }
    }

    fn filter(self) -> fr::FilterType {
        match self {
            Self::Area => fr::FilterType::Box,
            Self::Lanczos => fr::FilterType::Lanczos3,
        }
    }
}

/// Resample an RGB buffer to exact dimensions
///
/// # Errors
/// - `UpscaleError::Internal` for zero-sized source/target or a resizer failure
pub fn resample(
    image: &RgbImage,
    width: u32,
    height: u32,
    interpolation: Interpolation,
) -> Result<RgbImage> {
    let (src_width, src_height) = image.dimensions();
    if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
        return Err(UpscaleError::internal(format!(
            "cannot resample {src_width}x{src_height} to {width}x{height}"
        )));
    }

    let src = fr::images::ImageRef::new(
        src_width,
        src_height,
        image.as_raw(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| UpscaleError::internal(format!("resize source buffer: {e}")))?;

    let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x3);
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(interpolation.filter()));

    fr::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .map_err(|e| UpscaleError::internal(format!("resize: {e}")))?;

    RgbImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| UpscaleError::internal("resize produced a buffer of unexpected length"))
}

/// Resizes to one target dimension, deriving the other
pub struct AspectResizer;

impl AspectResizer {
    /// Resize so the pinned axis hits its target
    ///
    /// Never fails: on any resample error the input is returned unchanged.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::services::{AspectResizer, ResizeTarget};
    /// use image::RgbImage;
    ///
    /// let image = RgbImage::new(200, 100);
    /// let resized = AspectResizer::resize(image, ResizeTarget::Width(100));
    /// assert_eq!(resized.dimensions(), (100, 50));
    /// ```
    #[must_use]
    pub fn resize(image: RgbImage, target: ResizeTarget) -> RgbImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image;
        }

        let (new_width, new_height) = match target {
            ResizeTarget::None => return image,
            ResizeTarget::Width(w) if w == width => return image,
            ResizeTarget::Height(h) if h == height => return image,
            ResizeTarget::Width(w) => (w, derive_axis(height, w, width)),
            ResizeTarget::Height(h) => (derive_axis(width, h, height), h),
        };

        let interpolation = Interpolation::for_widths(width, new_width);
        tracing::debug!(
            from = %format!("{width}x{height}"),
            to = %format!("{new_width}x{new_height}"),
            ?interpolation,
            "Resizing"
        );

        match resample(&image, new_width, new_height, interpolation) {
            Ok(resized) => resized,
            Err(e) => {
                tracing::warn!("Resize to {new_width}x{new_height} failed, keeping original: {e}");
                image
            },
        }
    }

    /// Resize from optional width/height; width wins when both are set
    #[must_use]
    pub fn resize_to(image: RgbImage, width: Option<u32>, height: Option<u32>) -> RgbImage {
        let target = match (width, height) {
            (Some(w), _) => ResizeTarget::Width(w),
            (None, Some(h)) => ResizeTarget::Height(h),
            (None, None) => ResizeTarget::None,
        };
        Self::resize(image, target)
    }
}

/// `round(other * target / current)`, at least 1 unless target is 0
fn derive_axis(other: u32, target: u32, current: u32) -> u32 {
    let scale = f64::from(target) / f64::from(current);
    let derived = (f64::from(other) * scale).round() as u32;
    if target == 0 {
        0
    } else {
        derived.max(1)
    }
}
