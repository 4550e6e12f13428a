//! Audio crate for voxcorpus
//!
//! Decoding (hound for WAV, symphonia for everything else), sinc resampling
//! via rubato, peak normalization to the canonical waveform, and WAV
//! artifact writing.

pub mod error;
pub mod file_io;
pub mod normalizer;
pub mod resampling;

pub use error::AudioError;
pub use file_io::{load_audio_file, samples_to_wav_bytes, write_wav, DecodedAudio};
pub use normalizer::{
    peak_normalize, NormalizerConfig, SignalNormalizer, Waveform, CANONICAL_SAMPLE_RATE,
    DEFAULT_HEADROOM,
};
pub use resampling::resample;
