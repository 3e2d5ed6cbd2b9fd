use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the scanner, the thumbnail cache and the viewer launcher
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to process image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{program} failed: {reason}")]
    Convert { program: String, reason: String },

    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("image viewer command is empty")]
    EmptyViewerCommand,

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no root directory selected")]
    NoRootDirectory,
}

impl GalleryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GalleryError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        GalleryError::Image {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
