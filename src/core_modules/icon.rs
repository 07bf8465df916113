// THEORY:
// The `Icon` is the fingerprint itself: a tiny square grid (11x11 in the
// canonical configuration) of luma, chroma-blue and chroma-red values, plus the
// size of the image it was made from. Fine details are deliberately lost; what
// remains is the color layout, which survives resizing and recompression.
//
// Generation runs in two stages that together approximate a proper low-pass
// filter while only ever sampling pixels by nearest neighbor:
// 1.  **Large icon**: resample to a working grid of `large_side * block_samples`
//     pixels, average each `block_samples`-square block in RGB, and convert the
//     block mean to luma/chroma. `large_side` is odd (2 * icon_side + 1).
// 2.  **Small icon**: a 3x3 box filter with stride 2 over the interior of the
//     large icon removes the aliasing of stage 1 and halves the resolution.
// Finally every plane is stretched to [0, 255] (see `normalize`).
//
// Layout: three planes, each `side * side` values, row-major. The value of
// channel `ch` at `(x, y)` lives at `side * (ch * side + y) + x`.

use crate::config::IconConfig;
use crate::core_modules::chunk::chunk::Chunk;
use crate::core_modules::normalize::normalize;
use crate::core_modules::pixel::pixel::ycbcr;
use crate::core_modules::raster::Raster;
use crate::core_modules::resample::resample_by_nearest;
use crate::error::{IconError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NUM_CHANNELS: usize = 3;
const ONE_NINTH: f32 = 1.0 / 9.0;

const ICON_MAGIC: &[u8; 4] = b"ICN1";
const HEADER_LEN: usize = 16;

/// An integer pixel coordinate inside an icon grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Width and height of a source image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Position of `(p.x, p.y)` in channel `ch` of a flat icon array with `side`.
pub fn arr_index(p: Point, side: usize, ch: usize) -> usize {
    side * (ch * side + p.y) + p.x
}

/// A normalized luma/chroma fingerprint of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIcon")]
pub struct Icon {
    pixels: Vec<f32>,
    side: usize,
    original_size: ImageSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
}

#[derive(Deserialize)]
struct RawIcon {
    pixels: Vec<f32>,
    side: usize,
    original_size: ImageSize,
    #[serde(default)]
    source_id: Option<String>,
}

impl TryFrom<RawIcon> for Icon {
    type Error = IconError;

    fn try_from(raw: RawIcon) -> Result<Self> {
        let icon = Icon::from_parts(raw.pixels, raw.side, raw.original_size)?;
        Ok(match raw.source_id {
            Some(id) => icon.with_source_id(id),
            None => icon,
        })
    }
}

impl Icon {
    /// A zero-filled icon of `side x side` pixels.
    pub fn new(side: usize, original_size: ImageSize) -> Self {
        Self {
            pixels: vec![0.0; NUM_CHANNELS * side * side],
            side,
            original_size,
            source_id: None,
        }
    }

    /// Wraps an existing pixel array. Fails unless it holds exactly three
    /// `side x side` planes.
    pub fn from_parts(pixels: Vec<f32>, side: usize, original_size: ImageSize) -> Result<Self> {
        if side == 0 || pixels.len() != NUM_CHANNELS * side * side {
            return Err(IconError::MalformedIcon(format!(
                "{} values do not form three {side}x{side} planes",
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            side,
            original_size,
            source_id: None,
        })
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn num_pixels(&self) -> usize {
        self.side * self.side
    }

    pub fn original_size(&self) -> ImageSize {
        self.original_size
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// One channel plane (0 = luma, 1 = chroma-blue, 2 = chroma-red).
    ///
    /// # Panics
    ///
    /// Panics if `ch >= NUM_CHANNELS`.
    pub fn plane(&self, ch: usize) -> &[f32] {
        let n = self.num_pixels();
        &self.pixels[ch * n..(ch + 1) * n]
    }

    /// The three channel values at `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` lies outside the `side x side` grid.
    pub fn get(&self, p: Point) -> (f32, f32, f32) {
        assert!(
            p.x < self.side && p.y < self.side,
            "point ({}, {}) outside a {}x{} icon",
            p.x,
            p.y,
            self.side,
            self.side
        );
        (
            self.pixels[arr_index(p, self.side, 0)],
            self.pixels[arr_index(p, self.side, 1)],
            self.pixels[arr_index(p, self.side, 2)],
        )
    }

    pub(crate) fn set(&mut self, p: Point, c1: f32, c2: f32, c3: f32) {
        let side = self.side;
        self.pixels[arr_index(p, side, 0)] = c1;
        self.pixels[arr_index(p, side, 1)] = c2;
        self.pixels[arr_index(p, side, 2)] = c3;
    }

    /// Luma at each of `points`, widened to f64 for hashing. Callers validate
    /// the points first (see `validate_hyper_points`); an outside point panics.
    pub fn luma_values(&self, points: &[Point]) -> Vec<f64> {
        points.iter().map(|&p| self.pixels[arr_index(p, self.side, 0)] as f64).collect()
    }

    /// Lossless binary form: magic `ICN1`, then little-endian `u32` side, width
    /// and height, then every `f32` value in plane order. `source_id` is not
    /// encoded.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.pixels.len() * 4);
        out.extend_from_slice(ICON_MAGIC);
        out.extend_from_slice(&(self.side as u32).to_le_bytes());
        out.extend_from_slice(&self.original_size.width.to_le_bytes());
        out.extend_from_slice(&self.original_size.height.to_le_bytes());
        for v in &self.pixels {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Inverse of [`Icon::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[0..4] != ICON_MAGIC {
            return Err(IconError::MalformedIcon("missing ICN1 header".into()));
        }
        let read_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let side = read_u32(4) as usize;
        let original_size = ImageSize::new(read_u32(8), read_u32(12));

        let body = &bytes[HEADER_LEN..];
        let expected = side
            .checked_mul(side)
            .and_then(|n| n.checked_mul(NUM_CHANNELS * 4))
            .ok_or_else(|| IconError::MalformedIcon(format!("side {side} overflows")))?;
        if body.len() != expected {
            return Err(IconError::MalformedIcon(format!(
                "expected {expected} payload bytes for side {side}, got {}",
                body.len()
            )));
        }
        let pixels = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Icon::from_parts(pixels, side, original_size)
    }
}

/// Generates the icon of `src` and records its original size.
pub fn make_icon<R: Raster + ?Sized>(src: &R, config: &IconConfig) -> Result<Icon> {
    let large = icon_large(src, config)?;
    let mut small = icon_small(&large, config.icon_side);
    normalize(&mut small.pixels, config.num_pixels(), config.degenerate_policy)?;
    debug!(
        width = small.original_size.width,
        height = small.original_size.height,
        side = small.side,
        "icon generated"
    );
    Ok(small)
}

/// Stage 1: block-averaged luma/chroma icon of side `config.large_side()`.
pub fn icon_large<R: Raster + ?Sized>(src: &R, config: &IconConfig) -> Result<Icon> {
    let large_side = config.large_side();
    let block = config.block_samples as u32;
    // Fits u32: `IconConfig::validate` checks the working side.
    let working_side = config.working_side() as u32;
    let resampled = resample_by_nearest(src, working_side, working_side)?;

    let mut icon = Icon::new(
        large_side,
        ImageSize::new(resampled.source_width, resampled.source_height),
    );
    for y in 0..large_side {
        for x in 0..large_side {
            let chunk = Chunk::new(&resampled.grid, x as u32 * block, y as u32 * block, block);
            let [r, g, b] = chunk.average_rgb();
            let (yc, cb, cr) = ycbcr(r, g, b);
            icon.set(Point::new(x, y), yc, cb, cr);
        }
    }
    Ok(icon)
}

/// Stage 2: 3x3 box filter with stride 2 over the interior of `large`.
/// The result is not normalized yet.
pub fn icon_small(large: &Icon, side: usize) -> Icon {
    let large_side = large.side;
    let mut dst = Icon::new(side, large.original_size);
    let num_src = large_side * large_side;

    for y in (1..large_side.saturating_sub(1)).step_by(2) {
        for x in (1..large_side.saturating_sub(1)).step_by(2) {
            let mut sums = [0.0f32; NUM_CHANNELS];
            for n in 0..3 {
                for m in 0..3 {
                    let i = (y + m - 1) * large_side + (x + n - 1);
                    for (ch, sum) in sums.iter_mut().enumerate() {
                        *sum += large.pixels[ch * num_src + i];
                    }
                }
            }
            let (xd, yd) = (x / 2, y / 2);
            if xd < side && yd < side {
                dst.set(
                    Point::new(xd, yd),
                    sums[0] * ONE_NINTH,
                    sums[1] * ONE_NINTH,
                    sums[2] * ONE_NINTH,
                );
            }
        }
    }
    dst
}
