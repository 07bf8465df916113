// THEORY:
// Nearest-neighbor resampling is the cheap first half of the icon low-pass
// filter. Each destination pixel copies exactly one source pixel, found with
// integer division, so the output is a deterministic function of the input and
// never interpolates. Alpha is folded into the colors (premultiplied) and then
// dropped: the icon only cares about what the image looks like over black.

use crate::core_modules::raster::Raster;
use crate::error::{IconError, Result};
use image::{Rgb, RgbImage};

/// A resampled grid plus the size of the image it came from.
#[derive(Debug, Clone)]
pub struct Resampled {
    pub grid: RgbImage,
    pub source_width: u32,
    pub source_height: u32,
}

/// Resizes `src` to `target_width x target_height` by the nearest neighbor method.
pub fn resample_by_nearest<R: Raster + ?Sized>(
    src: &R,
    target_width: u32,
    target_height: u32,
) -> Result<Resampled> {
    let (source_width, source_height) = src.dimensions();
    if source_width == 0 || source_height == 0 {
        return Err(IconError::InvalidDimensions {
            width: source_width,
            height: source_height,
        });
    }
    if target_width == 0 || target_height == 0 {
        return Err(IconError::InvalidDimensions {
            width: target_width,
            height: target_height,
        });
    }

    let grid = RgbImage::from_fn(target_width, target_height, |x, y| {
        let sx = (x as u64 * source_width as u64 / target_width as u64) as u32;
        let sy = (y as u64 * source_height as u64 / target_height as u64) as u32;
        Rgb(src.pixel_at(sx, sy).premultiplied())
    });

    Ok(Resampled {
        grid,
        source_width,
        source_height,
    })
}
