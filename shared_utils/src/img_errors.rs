//! Shared Image Error Types
//!
//! One error enum for every img-canon operation. Per-file failures are turned
//! into batch buckets by the orchestrator, so callers mostly match on the
//! variant rather than print it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanonError {
    /// The image handle carries no source path to derive an output from.
    #[error("Image has no source path")]
    NotFound,

    /// The canonical output path is already taken by an unrelated file.
    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Not a readable image: {} ({reason})", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error(
        "Cannot split {}: {width}x{height} needs an even width and a height divisible by 4",
        path.display()
    )]
    InvalidGeometry {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl CanonError {
    /// True when the source bytes are not an image the codec understands.
    ///
    /// Decoder I/O errors are excluded: those mean the file could not be read,
    /// not that it is something other than an image.
    pub fn is_unreadable(&self) -> bool {
        match self {
            CanonError::Unreadable { .. } => true,
            CanonError::Image(e) => matches!(
                e,
                image::ImageError::Decoding(_) | image::ImageError::Unsupported(_)
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CanonError>;
