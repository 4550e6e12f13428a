//! Error types for analysis and pipeline runs

use thiserror::Error;
use voxcorpus_audio::AudioError;

/// Per-segment analysis failure. Callers building a selection pool map this
/// to [`voxcorpus_types::QualityMetrics::sentinel`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentFailure {
    #[error("segment too short for frame analysis: {samples} samples, need {required}")]
    TooShort { samples: usize, required: usize },

    #[error("segment contains non-finite samples")]
    NonFinite,

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("contrast band edge {band_hz} Hz is not below nyquist {nyquist_hz} Hz")]
    BandExceedsNyquist { band_hz: f64, nyquist_hz: f64 },

    #[error("contrast band {low_hz}-{high_hz} Hz has no frequency bins")]
    EmptyBand { low_hz: f64, high_hz: f64 },

    #[error("FFT failed: {0}")]
    Fft(String),
}

/// File-level failure. The run for that file is aborted; the caller logs and
/// moves on to the next file.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{file}: decode failed: {source}")]
    Decode {
        file: String,
        #[source]
        source: AudioError,
    },

    #[error("{file}: processing failed: {source}")]
    Processing {
        file: String,
        #[source]
        source: AudioError,
    },

    #[error("{file}: transcription failed: {message}")]
    Transcription { file: String, message: String },

    #[error("{file}: writing {path} failed: {source}")]
    Artifact {
        file: String,
        path: String,
        #[source]
        source: AudioError,
    },
}

impl PipelineError {
    /// Classify a normalizer error for `file`
    pub(crate) fn from_audio(file: &str, err: AudioError) -> Self {
        if err.is_decode() {
            Self::Decode {
                file: file.to_string(),
                source: err,
            }
        } else {
            Self::Processing {
                file: file.to_string(),
                source: err,
            }
        }
    }

    pub fn file(&self) -> &str {
        match self {
            Self::Decode { file, .. }
            | Self::Processing { file, .. }
            | Self::Transcription { file, .. }
            | Self::Artifact { file, .. } => file,
        }
    }

    /// Pipeline stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::Processing { .. } => "normalize",
            Self::Transcription { .. } => "transcribe",
            Self::Artifact { .. } => "write-artifact",
        }
    }
}
