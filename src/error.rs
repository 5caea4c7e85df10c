use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling an FCN model or loading its weights.
///
/// Every variant is fatal for the call that produced it: the factory never
/// retries and never falls back to randomly initialized weights.
#[derive(Debug, Error)]
pub enum FcnError {
    #[error("unknown backbone: {0}")]
    UnsupportedBackbone(String),

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("unknown model variant: {0}")]
    UnknownVariant(String),

    #[error("pretrained weights `{key}` not found at {}", path.display())]
    WeightsNotFound { key: String, path: PathBuf },

    #[error("weights at {} do not fit the constructed model: {reason}", path.display())]
    WeightsShapeMismatch { path: PathBuf, reason: String },

    #[error("input of {height}x{width} is too small, both sides must be at least {min}")]
    InputTooSmall {
        height: usize,
        width: usize,
        min: usize,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, FcnError>;
