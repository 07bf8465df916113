// THEORY:
// Decoding image files is somebody else's job. The fingerprinting pipeline only
// needs to ask "how big is this image" and "what color is pixel (x, y)". The
// `Raster` trait is that seam. It is implemented for the `image` crate's common
// buffers and for a borrowed raw RGBA frame buffer, the shape frames arrive in
// when they come straight off a capture device or a foreign decoder.

use crate::core_modules::pixel::pixel::Pixel;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};

const RGBA_CHANNELS: usize = 4;

/// Read-only pixel access to a decoded image.
pub trait Raster {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// The straight-alpha RGBA value at `(x, y)`. Callers stay inside `dimensions()`.
    fn pixel_at(&self, x: u32, y: u32) -> Pixel;
}

impl Raster for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbImage::dimensions(self)
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let [r, g, b] = self.get_pixel(x, y).0;
        Pixel::opaque(r, g, b)
    }
}

impl Raster for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbaImage::dimensions(self)
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let [r, g, b, a] = self.get_pixel(x, y).0;
        Pixel::new(r, g, b, a)
    }
}

impl Raster for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let [r, g, b, a] = self.get_pixel(x, y).0;
        Pixel::new(r, g, b, a)
    }
}

/// A borrowed, tightly packed RGBA8 buffer (row-major, 4 bytes per pixel).
#[derive(Debug, Clone, Copy)]
pub struct RgbaFrame<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> RgbaFrame<'a> {
    /// Wraps a frame buffer. Returns `None` when the buffer is shorter than
    /// `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Option<Self> {
        let needed = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(RGBA_CHANNELS)?;
        if data.len() < needed {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }
}

impl Raster for RgbaFrame<'_> {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        let byte_index = ((y as usize * self.width as usize) + x as usize) * RGBA_CHANNELS;
        Pixel::from(&self.data[byte_index..byte_index + RGBA_CHANNELS])
    }
}
