// THEORY:
// Every failure in the crate is local and synchronous: bad input dimensions, a
// hash configuration that cannot discretize anything, a flat color plane when
// the caller asked to reject those, or a malformed serialized icon. None of
// them are retried, since the same input reproduces the same failure. A single
// enum keeps the public surface small and lets `?` flow through every layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IconError>;

#[derive(Debug, Error)]
pub enum IconError {
    /// A source image or resample target with a zero side.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid hash configuration: {0}")]
    InvalidHashConfig(String),

    /// A normalization plane with zero dynamic range under `DegeneratePolicy::Reject`.
    #[error("channel {channel} has zero dynamic range")]
    DegenerateChannel { channel: usize },

    /// Two icons with different grid sides cannot be compared.
    #[error("icons are not comparable: side {left} vs side {right}")]
    IncompatibleIcons { left: usize, right: usize },

    #[error("malformed icon encoding: {0}")]
    MalformedIcon(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("worker pool failure: {0}")]
    WorkerPool(&'static str),
}
