// THEORY:
// Every tunable constant of the icon generator, the hash generator and the
// similarity engine lives in one immutable `PipelineConfig` value. Several
// configurations (for example different icon resolutions) can coexist in one
// process. Defaults are the canonical, calibrated values; a TOML file may
// override any subset of them.
//
// Validation happens once, up front: a config that passes `validate` cannot
// make any later stage fail on its parameters, and it cannot ask the hash
// generator for more than `MAX_HASH_DIMENSIONS` dimensions.

use crate::core_modules::icon::Point;
use crate::core_modules::point_selector::HYPER_POINTS_10;
use crate::error::{IconError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Lower edge of the luma range the hash generator discretizes.
pub const HASH_MIN: f64 = 0.0;
/// Upper edge of the luma range the hash generator discretizes.
pub const HASH_MAX: f64 = 255.0;

/// What normalization does with a color plane whose values are all equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Fill the plane with 0.0.
    #[default]
    Zero,
    /// Fill the plane with 128.0.
    Midpoint,
    /// Fail with `IconError::DegenerateChannel`.
    Reject,
}

/// Icon generator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IconConfig {
    /// Side of the final icon in pixels.
    #[serde(default = "default_icon_side")]
    pub icon_side: usize,
    /// Resampled pixels per large-icon pixel, along one axis.
    #[serde(default = "default_block_samples")]
    pub block_samples: usize,
    #[serde(default)]
    pub degenerate_policy: DegeneratePolicy,
}

fn default_icon_side() -> usize {
    11
}
fn default_block_samples() -> usize {
    12
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            icon_side: default_icon_side(),
            block_samples: default_block_samples(),
            degenerate_policy: DegeneratePolicy::default(),
        }
    }
}

impl IconConfig {
    /// Side of the intermediate icon. Odd, so a stride-2 3x3 box filter over its
    /// interior lands exactly on `icon_side` pixels.
    pub fn large_side(&self) -> usize {
        2 * self.icon_side + 1
    }

    /// Side of the nearest-neighbor working grid.
    pub fn working_side(&self) -> usize {
        self.large_side() * self.block_samples
    }

    /// Pixels per channel plane of the final icon.
    pub fn num_pixels(&self) -> usize {
        self.icon_side * self.icon_side
    }

    pub fn validate(&self) -> Result<()> {
        if self.icon_side == 0 || self.block_samples == 0 {
            return Err(IconError::Config(format!(
                "icon_side ({}) and block_samples ({}) must be positive",
                self.icon_side, self.block_samples
            )));
        }
        if u32::try_from(self.working_side()).is_err() {
            return Err(IconError::Config(format!(
                "working grid side {} does not fit a raster dimension",
                self.working_side()
            )));
        }
        Ok(())
    }
}

/// Discretization parameters shared by indexing and querying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashConfig {
    /// Fraction of a bucket width treated as ambiguous at each bucket boundary.
    #[serde(default = "default_eps_percent")]
    pub eps_percent: f64,
    /// Buckets per dimension over `[HASH_MIN, HASH_MAX]`.
    #[serde(default = "default_num_buckets")]
    pub num_buckets: usize,
}

fn default_eps_percent() -> f64 {
    0.25
}
fn default_num_buckets() -> usize {
    4
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            eps_percent: default_eps_percent(),
            num_buckets: default_num_buckets(),
        }
    }
}

impl HashConfig {
    pub fn new(eps_percent: f64, num_buckets: usize) -> Result<Self> {
        let config = Self {
            eps_percent,
            num_buckets,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn bucket_width(&self) -> f64 {
        (HASH_MAX - HASH_MIN) / self.num_buckets as f64
    }

    pub fn eps(&self) -> f64 {
        self.eps_percent * self.bucket_width()
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_buckets < 1 {
            return Err(IconError::InvalidHashConfig(format!(
                "num_buckets must be at least 1, got {}",
                self.num_buckets
            )));
        }
        if !self.eps_percent.is_finite() || !(0.0..1.0).contains(&self.eps_percent) {
            return Err(IconError::InvalidHashConfig(format!(
                "eps_percent must be in [0, 1), got {}",
                self.eps_percent
            )));
        }
        Ok(())
    }
}

/// Calibrated thresholds of the similarity engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Per-pixel color tolerance.
    #[serde(default = "default_color_diff")]
    pub color_diff: f32,
    /// Aggregate scaling of the squared Euclidean cutoff.
    #[serde(default = "default_eucl_coeff")]
    pub eucl_coeff: f32,
    /// How much looser the chroma planes are than luma.
    #[serde(default = "default_chan_coeff")]
    pub chan_coeff: f32,
    /// Maximum relative difference of normalized aspect ratios.
    #[serde(default = "default_proportion_threshold")]
    pub proportion_threshold: f64,
}

fn default_color_diff() -> f32 {
    50.0
}
fn default_eucl_coeff() -> f32 {
    0.2
}
fn default_chan_coeff() -> f32 {
    2.0
}
fn default_proportion_threshold() -> f64 {
    0.05
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            color_diff: default_color_diff(),
            eucl_coeff: default_eucl_coeff(),
            chan_coeff: default_chan_coeff(),
            proportion_threshold: default_proportion_threshold(),
        }
    }
}

impl SimilarityConfig {
    /// Squared Euclidean cutoff for the luma plane of an icon with `icon_side`.
    pub fn threshold_y(&self, icon_side: usize) -> f32 {
        (icon_side * icon_side) as f32 * (self.color_diff * self.color_diff) * self.eucl_coeff
    }

    /// Squared Euclidean cutoff for each chroma plane.
    pub fn threshold_cbcr(&self, icon_side: usize) -> f32 {
        self.threshold_y(icon_side) * self.chan_coeff
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.color_diff as f64)
            || !positive(self.eucl_coeff as f64)
            || !positive(self.chan_coeff as f64)
            || !positive(self.proportion_threshold)
        {
            return Err(IconError::Config(format!(
                "similarity thresholds must be positive and finite: {self:?}"
            )));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Icon pixels sampled for hashing, one per hash dimension.
    #[serde(default = "default_hyper_points")]
    pub hyper_points: Vec<Point>,
    #[serde(default)]
    pub icon: IconConfig,
    #[serde(default)]
    pub hash: HashConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

fn default_hyper_points() -> Vec<Point> {
    HYPER_POINTS_10.to_vec()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hyper_points: default_hyper_points(),
            icon: IconConfig::default(),
            hash: HashConfig::default(),
            similarity: SimilarityConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.icon.validate()?;
        self.hash.validate()?;
        self.similarity.validate()?;
        validate_hyper_points(&self.hyper_points, self.icon.icon_side)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| IconError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IconError::Config(e.to_string()))
    }

    /// Loads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            e
        })?;
        info!("Config loaded from: {}", path.display());
        Ok(config)
    }
}

/// Most hyper points a hash configuration may use. Every dimension near a
/// bucket boundary doubles the hash set, so the set holds up to
/// `2^MAX_HASH_DIMENSIONS` keys.
pub const MAX_HASH_DIMENSIONS: usize = 16;

/// Hyper points must be non-empty, at most `MAX_HASH_DIMENSIONS` of them, and
/// inside an `icon_side x icon_side` grid.
pub fn validate_hyper_points(points: &[Point], icon_side: usize) -> Result<()> {
    if points.is_empty() {
        return Err(IconError::InvalidHashConfig("hyper point set is empty".into()));
    }
    if points.len() > MAX_HASH_DIMENSIONS {
        return Err(IconError::InvalidHashConfig(format!(
            "{} hyper points exceed the limit of {MAX_HASH_DIMENSIONS}",
            points.len()
        )));
    }
    if let Some(p) = points.iter().find(|p| p.x >= icon_side || p.y >= icon_side) {
        return Err(IconError::InvalidHashConfig(format!(
            "hyper point ({}, {}) is outside a {}x{} icon",
            p.x, p.y, icon_side, icon_side
        )));
    }
    Ok(())
}
