//! Errors raised while opening sources and sinks.

use std::path::PathBuf;

use mosaic_engine::MirrorError;

/// Errors that can occur when touching the filesystem.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// A file or directory could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The path being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file was read but is not a decodable image.
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        /// The offending file.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// A directory holds no files with a supported image extension.
    #[error("no images found in {}", .0.display())]
    EmptySequence(PathBuf),

    /// An output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        /// The directory being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl From<IoError> for MirrorError {
    fn from(err: IoError) -> Self {
        Self::SourceUnavailable(err.to_string())
    }
}
