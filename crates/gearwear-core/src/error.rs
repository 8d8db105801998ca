use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the analysis pipelines and table I/O.
///
/// Per-unit failures (an image with no usable teeth, a tooth with no match)
/// are not errors: they yield empty results or skipped pairings so a batch
/// can continue. Only missing resources and malformed files reach callers.
#[derive(Error, Debug)]
pub enum WearError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("missing resource: {0}")]
    MissingResource(PathBuf),

    #[error("malformed results table {path}: {reason}")]
    Table { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WearError>;
