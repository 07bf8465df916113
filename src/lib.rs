// THEORY:
// This file is the main entry point for the `icon_dedup` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (an image store, a crawler, a
// deduplication job).
//
// The primary goal is to export the `IconPipeline` facade and its configuration
// as the clean, high-level interface: fingerprint an image, index its hash keys,
// look up candidates, confirm them. The building blocks in `core_modules` stay
// public for callers that need one stage on its own (for example the offline
// hyper point selection), but most users never touch them directly.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{DegeneratePolicy, HashConfig, IconConfig, PipelineConfig, SimilarityConfig};
pub use core_modules::icon::{Icon, ImageSize, Point};
pub use core_modules::raster::{Raster, RgbaFrame};
pub use core_modules::similarity::HashTable;
pub use error::{IconError, Result};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{Fingerprint, IconPipeline};
