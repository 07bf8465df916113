pub mod chunk;
pub mod hashes;
pub mod hyper;
pub mod icon;
pub mod normalize;
pub mod pixel;
pub mod point_selector;
pub mod raster;
pub mod resample;
pub mod similarity;
pub mod utils;
