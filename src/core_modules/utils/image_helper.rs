// THEORY:
// File-level helpers around the fingerprint pipeline: opening an image file
// straight into an icon, and writing an icon out as a false-color PNG so a
// human can eyeball what the similarity engine compares. The preview maps the
// luma, chroma-blue and chroma-red planes onto the R, G and B channels; it is a
// diagnostic, not a reconstruction of the source image.

pub mod image_helper {
    use crate::config::IconConfig;
    use crate::core_modules::icon::{Icon, Point, make_icon};
    use crate::error::Result;
    use image::{ImageEncoder, Rgb, RgbImage};
    use std::path::Path;
    use tracing::debug;

    /// Encodes a tightly packed RGB8 buffer as PNG.
    pub fn save(path: impl AsRef<Path>, width: u32, height: u32, buffer: &[u8]) -> Result<()> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(buffer, width, height, image::ExtendedColorType::Rgb8)?;

        Ok(())
    }

    /// Encodes an RGB image as baseline JPEG at `quality` (1-100).
    pub fn save_jpeg(image: &RgbImage, path: impl AsRef<Path>, quality: u8) -> Result<()> {
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(output, quality);

        encoder.write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgb8)?;

        Ok(())
    }

    fn to_channel(v: f32) -> u8 {
        v.round().clamp(0.0, 255.0) as u8
    }

    /// One RGB pixel per icon pixel: R = luma, G = chroma-blue, B = chroma-red.
    pub fn icon_to_image(icon: &Icon) -> RgbImage {
        let side = icon.side() as u32;
        RgbImage::from_fn(side, side, |x, y| {
            let (c1, c2, c3) = icon.get(Point::new(x as usize, y as usize));
            Rgb([to_channel(c1), to_channel(c2), to_channel(c3)])
        })
    }

    /// Writes the false-color preview of `icon` as a PNG file.
    pub fn save_icon_png(icon: &Icon, path: impl AsRef<Path>) -> Result<()> {
        let preview = icon_to_image(icon);
        save(path, preview.width(), preview.height(), preview.as_raw())
    }

    /// Decodes an image file and generates its icon, tagged with the path.
    pub fn open_icon(path: impl AsRef<Path>, config: &IconConfig) -> Result<Icon> {
        let path = path.as_ref();
        let decoded = image::open(path)?;
        let icon = make_icon(&decoded, config)?;
        debug!("Icon generated for: {}", path.display());
        Ok(icon.with_source_id(path.display().to_string()))
    }
}
