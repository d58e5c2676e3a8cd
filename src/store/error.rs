//! Errors surfaced by attribute store sessions.

use super::ConfigError;
use crate::format::TrailerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during attribute store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file or reader could not be opened or read.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path of the host, or `<reader>`.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The host carries a malformed trailer, or a buffer carries none.
    #[error("malformed attribute trailer: {0}")]
    Parse(#[from] TrailerError),
    /// Read of an attribute or frame index out of range.
    #[error("{what} index {index} out of range (count {count})")]
    Index {
        /// Kind of item indexed.
        what: &'static str,
        /// Requested index.
        index: usize,
        /// Number of items available.
        count: usize,
    },
    /// Write to a frame at or beyond the timestamp-defined frame count.
    #[error("frame {frame} is beyond the {frame_count} frames defined by the timestamps")]
    FrameIndex {
        /// Requested frame.
        frame: usize,
        /// Current frame count.
        frame_count: usize,
    },
    /// Two-phase read retry signal.
    #[error("destination buffer too small: {required} bytes required")]
    BufferTooSmall {
        /// Size of the value to retry with.
        required: usize,
    },
    /// The store was closed or discarded.
    #[error("attribute store is closed")]
    InvalidHandle,
    /// Committing the trailer failed; the previous host is intact.
    #[error("failed to write attributes to {path}: {source}")]
    Write {
        /// Path of the host.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Operation not available for this backing kind.
    #[error("operation not supported by a {0}-backed store")]
    Unsupported(&'static str),
    /// Invalid session configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Returns the size to retry with if this is the two-phase retry signal.
    pub fn required_size(&self) -> Option<usize> {
        match self {
            Self::BufferTooSmall { required } => Some(*required),
            _ => None,
        }
    }
}
