//! Exit codes for the CLI.

use voxcorpus_ml::PipelineError;

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command-line arguments or missing inputs
    InvalidArguments = 2,
    /// Input audio could not be decoded
    DecodeFailed = 3,
    /// Normalization or artifact writing failed
    ProcessingFailed = 4,
    /// No transcription could be obtained
    TranscriptionFailed = 5,
    /// Database could not be opened or written
    StoreFailed = 6,
    /// Requested record does not exist
    NotFound = 7,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Classify a command failure
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<PipelineError>() {
            return match e {
                PipelineError::Decode { .. } => ExitCode::DecodeFailed,
                PipelineError::Transcription { .. } => ExitCode::TranscriptionFailed,
                PipelineError::Processing { .. } | PipelineError::Artifact { .. } => {
                    ExitCode::ProcessingFailed
                }
            };
        }
        if err.downcast_ref::<voxcorpus_lib::store::StoreError>().is_some() {
            return ExitCode::StoreFailed;
        }
        if err.downcast_ref::<voxcorpus_audio::AudioError>().is_some() {
            return ExitCode::DecodeFailed;
        }
        ExitCode::GeneralError
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::DecodeFailed => write!(f, "decode failed"),
            ExitCode::ProcessingFailed => write!(f, "processing failed"),
            ExitCode::TranscriptionFailed => write!(f, "transcription failed"),
            ExitCode::StoreFailed => write!(f, "store failed"),
            ExitCode::NotFound => write!(f, "not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_stage_codes() {
        let err = anyhow::Error::new(PipelineError::Transcription {
            file: "a.wav".into(),
            message: "offline".into(),
        });
        assert_eq!(ExitCode::for_error(&err), ExitCode::TranscriptionFailed);
        assert_eq!(ExitCode::for_error(&anyhow::anyhow!("boom")), ExitCode::GeneralError);
        assert_eq!(ExitCode::TranscriptionFailed.as_i32(), 5);
    }
}
