//! Engine traits

use anyhow::Result;
use voxcorpus_audio::Waveform;
use voxcorpus_types::TranscriptionResult;

/// Trait for transcription sources
pub trait TranscriptionEngine: Send + Sync {
    /// Engine name
    fn name(&self) -> &str;

    /// Coarse full-text transcription without timing
    fn transcribe(&self, waveform: &Waveform) -> Result<String>;

    /// Transcription with per-utterance timestamps where the source has them
    fn transcribe_with_timestamps(&self, waveform: &Waveform) -> Result<TranscriptionResult>;
}
