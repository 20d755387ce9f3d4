//! Error type shared by the tracker, the detector backends and the dataset tools.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors surfaced to the caller.
///
/// Conditions that are part of normal tracking (no candidate in a frame, the
/// short-term tracker losing its lock, the end of a frame stream) are not
/// errors and never produce one of these.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The detector model artifact could not be loaded.
    #[error("failed to load detector model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Model inference failed on a frame.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
