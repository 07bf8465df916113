// THEORY:
// The `pipeline` module is the final, top-level API for the fingerprint engine.
// It binds one validated `PipelineConfig` to the stateless stages in
// `core_modules` so callers never have to thread hyper points, hash parameters
// and thresholds through every call by hand.
//
// Typical flow over a large collection:
// 1.  **Index**: `fingerprint` each image (icon + hash set) and `record` its id
//     under every key in a caller-owned `HashTable`.
// 2.  **Query**: `candidates` looks up the central hash of a new icon, which
//     shrinks the collection to a handful of ids.
// 3.  **Confirm**: each candidate goes through `similar`.
//
// The pipeline owns no collection state; the table and the icon store belong to
// the caller, so one pipeline can serve any number of collections.

use crate::config::PipelineConfig;
use crate::core_modules::hashes;
use crate::core_modules::icon::{self, Icon};
use crate::core_modules::raster::Raster;
use crate::core_modules::similarity::{self, HashTable};
use crate::core_modules::utils::image_helper::image_helper::open_icon;
use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// An icon together with the keys it is indexed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub icon: Icon,
    /// The icon's hash set; the first key is its central hash.
    pub hashes: Vec<u64>,
}

impl Fingerprint {
    pub fn central_hash(&self) -> Option<u64> {
        self.hashes.first().copied()
    }
}

/// The main, top-level struct for the fingerprint engine.
#[derive(Debug, Clone)]
pub struct IconPipeline {
    config: PipelineConfig,
}

impl IconPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            icon_side = config.icon.icon_side,
            dimensions = config.hyper_points.len(),
            num_buckets = config.hash.num_buckets,
            "icon pipeline ready"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn make_icon<R: Raster + ?Sized>(&self, src: &R) -> Result<Icon> {
        icon::make_icon(src, &self.config.icon)
    }

    pub fn central_hash(&self, icon: &Icon) -> Result<u64> {
        hashes::central_hash(
            icon,
            &self.config.hyper_points,
            self.config.hash.eps_percent,
            self.config.hash.num_buckets,
        )
    }

    pub fn hash_set(&self, icon: &Icon) -> Result<Vec<u64>> {
        hashes::hash_set(
            icon,
            &self.config.hyper_points,
            self.config.hash.eps_percent,
            self.config.hash.num_buckets,
        )
    }

    /// Icon and index keys of one image.
    pub fn fingerprint<R: Raster + ?Sized>(&self, src: &R) -> Result<Fingerprint> {
        let icon = self.make_icon(src)?;
        let hashes = self.hash_set(&icon)?;
        Ok(Fingerprint { icon, hashes })
    }

    /// Decodes an image file and fingerprints it. The icon's source id is the path.
    pub fn fingerprint_file(&self, path: impl AsRef<Path>) -> Result<Fingerprint> {
        let icon = open_icon(path, &self.config.icon)?;
        let hashes = self.hash_set(&icon)?;
        Ok(Fingerprint { icon, hashes })
    }

    pub fn similar(&self, a: &Icon, b: &Icon) -> bool {
        similarity::similar(a, b, &self.config.similarity)
    }

    pub fn euclidean_similar(&self, a: &Icon, b: &Icon) -> bool {
        similarity::euclidean_similar(a, b, &self.config.similarity)
    }

    pub fn proportion_similar(&self, a: &Icon, b: &Icon) -> bool {
        similarity::proportion_similar(
            a.original_size(),
            b.original_size(),
            self.config.similarity.proportion_threshold,
        )
    }

    /// Files `id` under every key of `fingerprint`.
    pub fn record(&self, table: &mut HashTable, fingerprint: &Fingerprint, id: u64) {
        similarity::record(table, &fingerprint.hashes, id);
    }

    /// Ids of indexed images that are near-duplicates of `query`: prefiltered by
    /// the query's central hash, then confirmed against `icons`. Ids missing
    /// from `icons` are skipped.
    pub fn candidates(&self, query: &Icon, table: &HashTable, icons: &HashMap<u64, Icon>) -> Result<Vec<u64>> {
        let central = self.central_hash(query)?;
        let Some(ids) = similarity::fast_prefilter(&[central], table) else {
            debug!(central, "no candidates");
            return Ok(Vec::new());
        };
        let confirmed: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| icons.get(id).is_some_and(|icon| self.similar(query, icon)))
            .collect();
        debug!(central, prefiltered = ids.len(), confirmed = confirmed.len(), "candidates");
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::similarity::euclidean_metrics;
    use crate::error::IconError;
    use image::codecs::jpeg::JpegEncoder;
    use image::imageops::{self, FilterType};
    use image::{Rgb, RgbImage};

    fn pipeline() -> IconPipeline {
        IconPipeline::new(PipelineConfig::default()).expect("defaults are valid")
    }

    /// Smooth, photo-like content: red rises left to right, blue top to bottom,
    /// with a soft bright disc off-center.
    fn scene(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            let d = ((fx - 0.3).powi(2) + (fy - 0.6).powi(2)).sqrt();
            let glow = (1.0 - d * 3.0).max(0.0) * 80.0;
            Rgb([
                (fx * 170.0 + glow) as u8,
                (60.0 + glow) as u8,
                (fy * 170.0 + glow) as u8,
            ])
        })
    }

    /// Left dark, right bright, with no vertical structure.
    fn ramp(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            let r = (x * 255 / (width - 1)) as u8;
            Rgb([r, 100, 255 - r])
        })
    }

    fn jpeg_round_trip(img: &RgbImage, quality: u8) -> RgbImage {
        let mut bytes = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
            .expect("encodable");
        image::load_from_memory(&bytes).expect("decodable").to_rgb8()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.hash.num_buckets = 0;
        assert!(matches!(IconPipeline::new(config), Err(IconError::InvalidHashConfig(_))));
    }

    #[test]
    fn image_is_similar_to_itself() {
        let p = pipeline();
        let icon = p.make_icon(&scene(400, 300)).expect("valid image");
        assert!(p.similar(&icon, &icon));
    }

    #[test]
    fn recompressed_image_is_similar() {
        let p = pipeline();
        let original = scene(400, 300);
        let a = p.make_icon(&original).expect("valid image");
        let b = p.make_icon(&jpeg_round_trip(&original, 30)).expect("valid image");
        assert!(p.similar(&a, &b));
    }

    #[test]
    fn resized_image_is_similar() {
        let p = pipeline();
        let original = scene(400, 300);
        let smaller = imageops::resize(&original, 200, 150, FilterType::Triangle);
        let a = p.make_icon(&original).expect("valid image");
        let b = p.make_icon(&smaller).expect("valid image");
        assert!(p.proportion_similar(&a, &b));
        assert!(p.similar(&a, &b));
    }

    #[test]
    fn resized_grayscale_image_is_similar() {
        let p = pipeline();
        let gray = RgbImage::from_fn(400, 300, |x, y| {
            let v = ((x + y) * 255 / 698) as u8;
            Rgb([v, v, v])
        });
        let smaller = imageops::resize(&gray, 200, 150, FilterType::Triangle);
        let a = p.make_icon(&gray).expect("valid image");
        let b = p.make_icon(&smaller).expect("valid image");
        let (_, cb, cr) = euclidean_metrics(&a, &b).expect("same side");
        assert!(cb < 1.0 && cr < 1.0, "chroma distances {cb} {cr}");
        assert!(p.similar(&a, &b));
    }

    #[test]
    fn mirrored_image_is_not_similar() {
        let p = pipeline();
        let original = ramp(300, 200);
        let a = p.make_icon(&original).expect("valid image");
        let b = p.make_icon(&imageops::flip_horizontal(&original)).expect("valid image");
        assert!(p.proportion_similar(&a, &b));
        assert!(!p.euclidean_similar(&a, &b));
        assert!(!p.similar(&a, &b));
    }

    #[test]
    fn uniform_image_compares_without_failing() {
        let p = pipeline();
        let gray = RgbImage::from_pixel(50, 50, Rgb([128, 128, 128]));
        let fingerprint = p.fingerprint(&gray).expect("zero policy never fails");
        assert!(p.similar(&fingerprint.icon, &fingerprint.icon));
        assert_eq!(fingerprint.central_hash(), Some(p.central_hash(&fingerprint.icon).expect("valid")));
    }

    #[test]
    fn fingerprint_keys_start_with_the_central_hash() {
        let p = pipeline();
        let fingerprint = p.fingerprint(&scene(320, 240)).expect("valid image");
        let central = p.central_hash(&fingerprint.icon).expect("valid");
        assert_eq!(fingerprint.hashes[0], central);
        assert_eq!(fingerprint.hashes, p.hash_set(&fingerprint.icon).expect("valid"));
    }

    #[test]
    fn candidates_are_prefiltered_then_confirmed() {
        let p = pipeline();
        let original = ramp(300, 200);
        let mirrored = imageops::flip_horizontal(&original);

        let mut table = HashTable::new();
        let mut icons = HashMap::new();
        for (id, img) in [(1u64, &original), (2, &mirrored)] {
            let fingerprint = p.fingerprint(img).expect("valid image");
            p.record(&mut table, &fingerprint, id);
            icons.insert(id, fingerprint.icon);
        }

        let query = p.make_icon(&original).expect("valid image");
        assert_eq!(p.candidates(&query, &table, &icons).expect("valid"), vec![1]);
        assert!(p.candidates(&query, &HashTable::new(), &icons).expect("valid").is_empty());
    }
}
