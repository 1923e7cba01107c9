//! Real-ESRGAN background upscaler
//!
//! Drives an exported x4 super-resolution graph over overlapping tiles and
//! stitches the results. Any other `outscale` is a Lanczos resample of the
//! native x4 output.

use crate::{
    config::EngineConfig,
    engines::{image_to_tensor, tensor_to_image, BackgroundUpscaler, UpscaleInfo},
    error::{Result, UpscaleError},
    inference::{run_single, SharedSession},
    services::resize::{resample, Interpolation},
};
use image::RgbImage;
use instant::Instant;
use ndarray::{s, Array4};

/// Native magnification of `RealESRGAN_x4plus`
pub const MODEL_SCALE: u32 = 4;

const ENGINE: &str = "Real-ESRGAN";

/// Tiling parameters, in input pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    /// Tile edge (0 = whole image in one pass)
    pub tile: u32,
    /// Overlap read around each tile
    pub tile_pad: u32,
    /// Reflect padding on the bottom/right edge, cropped after inference
    pub pre_pad: u32,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile: 400,
            tile_pad: 10,
            pre_pad: 0,
        }
    }
}

impl From<&EngineConfig> for TileConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            tile: config.tile,
            tile_pad: config.tile_pad,
            pre_pad: config.pre_pad,
        }
    }
}

/// Tiled x4 super-resolution over a [`ModelSession`](crate::inference::ModelSession)
pub struct RealEsrganUpscaler {
    session: SharedSession,
    tiles: TileConfig,
}

impl RealEsrganUpscaler {
    #[must_use]
    pub fn new(session: SharedSession, tiles: TileConfig) -> Self {
        Self { session, tiles }
    }

    #[must_use]
    pub fn tiles(&self) -> TileConfig {
        self.tiles
    }

    /// Run the graph at its native scale; returns the image and the number of runs
    fn upscale_native(&self, image: &RgbImage) -> Result<(RgbImage, usize)> {
        let (width, height) = image.dimensions();
        let scale = MODEL_SCALE as usize;

        let mut input = image_to_tensor(image, |v| f32::from(v) / 255.0);
        if self.tiles.pre_pad > 0 {
            input = reflect_pad(&input, self.tiles.pre_pad as usize);
        }

        let (output, runs) = if self.tiles.tile > 0 {
            self.tile_process(&input)?
        } else {
            let (_, _, h, w) = input.dim();
            (self.run_checked(input, h, w, "whole image")?, 1)
        };

        let output = if self.tiles.pre_pad > 0 {
            output
                .slice(s![.., .., ..height as usize * scale, ..width as usize * scale])
                .to_owned()
        } else {
            output
        };

        let image = tensor_to_image(&output, |v| v.clamp(0.0, 1.0) * 255.0)?;
        Ok((image, runs))
    }

    /// Split into tiles, run each with `tile_pad` context, and stitch
    fn tile_process(&self, input: &Array4<f32>) -> Result<(Array4<f32>, usize)> {
        let (_, channels, height, width) = input.dim();
        let scale = MODEL_SCALE as usize;
        let tile = self.tiles.tile as usize;
        let pad = self.tiles.tile_pad as usize;

        let tiles_x = width.div_ceil(tile);
        let tiles_y = height.div_ceil(tile);
        let total = tiles_x * tiles_y;
        let mut output = Array4::<f32>::zeros((1, channels, height * scale, width * scale));

        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let index = ty * tiles_x + tx + 1;

                let x0 = tx * tile;
                let x1 = (x0 + tile).min(width);
                let y0 = ty * tile;
                let y1 = (y0 + tile).min(height);

                let pad_x0 = x0.saturating_sub(pad);
                let pad_x1 = (x1 + pad).min(width);
                let pad_y0 = y0.saturating_sub(pad);
                let pad_y1 = (y1 + pad).min(height);

                let tile_input = input
                    .slice(s![.., .., pad_y0..pad_y1, pad_x0..pad_x1])
                    .to_owned();
                let tile_output = self.run_checked(
                    tile_input,
                    pad_y1 - pad_y0,
                    pad_x1 - pad_x0,
                    &format!("tile {index}/{total}"),
                )?;

                let off_x = (x0 - pad_x0) * scale;
                let off_y = (y0 - pad_y0) * scale;
                let out_w = (x1 - x0) * scale;
                let out_h = (y1 - y0) * scale;

                output
                    .slice_mut(s![.., .., y0 * scale..y1 * scale, x0 * scale..x1 * scale])
                    .assign(&tile_output.slice(s![
                        ..1,
                        ..,
                        off_y..off_y + out_h,
                        off_x..off_x + out_w
                    ]));
                log::debug!("{ENGINE} tile {index}/{total} done");
            }
        }

        Ok((output, total))
    }

    /// Run one input and check the output is exactly `scale` times larger
    fn run_checked(
        &self,
        input: Array4<f32>,
        height: usize,
        width: usize,
        stage: &str,
    ) -> Result<Array4<f32>> {
        let scale = MODEL_SCALE as usize;
        let output = run_single(self.session.as_ref(), input)
            .map_err(|e| UpscaleError::inference_stage_error(ENGINE, stage, &e.to_string()))?;

        let expected = (1, 3, height * scale, width * scale);
        let (n, c, h, w) = output.dim();
        if n < 1 || c != 3 || h != expected.2 || w != expected.3 {
            return Err(UpscaleError::inference_stage_error(
                ENGINE,
                stage,
                &format!("expected output {expected:?}, got {:?}", output.shape()),
            ));
        }
        Ok(output)
    }
}

impl BackgroundUpscaler for RealEsrganUpscaler {
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<(RgbImage, UpscaleInfo)> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(UpscaleError::inference(format!(
                "{ENGINE}: cannot upscale a {width}x{height} image"
            )));
        }
        if !(outscale.is_finite() && outscale > 0.0) {
            return Err(UpscaleError::inference(format!(
                "{ENGINE}: invalid outscale {outscale}"
            )));
        }

        let start = Instant::now();
        let (native, tiles) = self.upscale_native(image)?;

        #[allow(clippy::float_cmp)]
        let output = if outscale == MODEL_SCALE as f32 {
            native
        } else {
            // Truncating
            let target_w = (width as f32 * outscale) as u32;
            let target_h = (height as f32 * outscale) as u32;
            resample(&native, target_w, target_h, Interpolation::Lanczos).map_err(|e| {
                UpscaleError::inference_stage_error(ENGINE, "outscale", &e.to_string())
            })?
        };

        log::info!(
            "{ENGINE}: {width}x{height} -> {}x{} ({tiles} run(s)) in {:.0}ms",
            output.width(),
            output.height(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok((
            output,
            UpscaleInfo {
                model_scale: MODEL_SCALE,
                outscale,
                tiles,
            },
        ))
    }
}

/// Mirror index into `0..len` without repeating the edge sample
fn reflect_index(index: usize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = index % period;
    if m < len {
        m
    } else {
        period - m
    }
}

/// Reflect-pad the bottom and right edges of a `[N, C, H, W]` tensor
fn reflect_pad(input: &Array4<f32>, pad: usize) -> Array4<f32> {
    let (n, c, h, w) = input.dim();
    Array4::from_shape_fn((n, c, h + pad, w + pad), |(b, ch, y, x)| {
        input[[b, ch, reflect_index(y, h), reflect_index(x, w)]]
    })
}
