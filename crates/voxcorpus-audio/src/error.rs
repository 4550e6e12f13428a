//! Audio error taxonomy

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    /// Source could not be opened or decoded
    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    /// Source decoded to zero samples
    #[error("{path} contains no audio samples")]
    Empty { path: String },
    /// Resampling or normalization failed
    #[error("{stage} failed: {message}")]
    Processing {
        stage: &'static str,
        message: String,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// Artifact could not be written
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

impl AudioError {
    pub(crate) fn decode(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn processing(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Processing {
            stage,
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// True for failures of the source file itself rather than of processing
    pub fn is_decode(&self) -> bool {
        matches!(self, AudioError::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
