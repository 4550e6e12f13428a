//! Canonical waveform preparation
//!
//! Every downstream stage works on one representation: mono, resampled to
//! the canonical rate, peak-normalized with headroom.

use crate::error::{AudioError, Result};
use crate::file_io::{self, DecodedAudio};
use crate::resampling;
use std::path::Path;

/// Canonical sample rate for analysis
pub const CANONICAL_SAMPLE_RATE: u32 = 16000;

/// Peak level after normalization, as a fraction of full scale
pub const DEFAULT_HEADROOM: f32 = 0.8;

/// Mono samples with their sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds: `sample_count / sample_rate`
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample index for a time in seconds (truncated, negative clamps to 0)
    pub fn sample_index(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64) as usize
    }

    /// Samples in `[start, end)` seconds, clamped to the waveform bounds.
    /// Returns `None` when the start lies at or past the end of the audio.
    pub fn slice_seconds(&self, start: f64, end: f64) -> Option<&[f32]> {
        let start_sample = self.sample_index(start);
        if start_sample >= self.samples.len() {
            return None;
        }
        let end_sample = self.sample_index(end).min(self.samples.len());
        if end_sample <= start_sample {
            return None;
        }
        Some(&self.samples[start_sample..end_sample])
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Normalizer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    pub target_sample_rate: u32,
    pub headroom: f32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: CANONICAL_SAMPLE_RATE,
            headroom: DEFAULT_HEADROOM,
        }
    }
}

/// Produces the canonical waveform from raw audio
#[derive(Debug, Clone, Default)]
pub struct SignalNormalizer {
    config: NormalizerConfig,
}

impl SignalNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Decode `input`, normalize it and write the canonical copy to `output`
    pub fn normalize_file(&self, input: &Path, output: &Path) -> Result<Waveform> {
        tracing::info!("Normalizing {:?}", input);

        let decoded = file_io::load_audio_file(input)?;
        let waveform = self.normalize(decoded)?;
        file_io::write_wav(output, waveform.samples(), waveform.sample_rate())?;

        tracing::info!(
            "Canonical copy written to {:?} ({:.2}s at {} Hz)",
            output,
            waveform.duration(),
            waveform.sample_rate()
        );

        Ok(waveform)
    }

    /// Resample already-decoded mono audio and peak-normalize it
    pub fn normalize(&self, decoded: DecodedAudio) -> Result<Waveform> {
        if decoded.samples.is_empty() {
            return Err(AudioError::processing("normalization", "no samples"));
        }

        let mut samples = resampling::resample(
            &decoded.samples,
            decoded.sample_rate,
            self.config.target_sample_rate,
        )?;

        if samples.iter().any(|s| !s.is_finite()) {
            return Err(AudioError::processing(
                "normalization",
                "non-finite sample values",
            ));
        }

        peak_normalize(&mut samples, self.config.headroom);

        Ok(Waveform::new(samples, self.config.target_sample_rate))
    }
}

/// Scale so the largest absolute sample equals `headroom`. Silence is left
/// untouched.
pub fn peak_normalize(samples: &mut [f32], headroom: f32) {
    let max_val = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if max_val > 0.0 {
        let gain = headroom / max_val;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_normalize_scales_to_headroom() {
        let mut samples = vec![0.1, -0.25, 0.2];
        peak_normalize(&mut samples, 0.8);
        assert!((samples[1] + 0.8).abs() < 1e-6);
        assert!((samples[0] - 0.32).abs() < 1e-6);
    }

    #[test]
    fn test_peak_normalize_leaves_silence() {
        let mut samples = vec![0.0; 16];
        peak_normalize(&mut samples, 0.8);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_slice_seconds_clamps() {
        let waveform = Waveform::new(vec![0.0; 16000], 16000);
        assert_eq!(waveform.slice_seconds(0.5, 2.0).unwrap().len(), 8000);
        assert!(waveform.slice_seconds(1.0, 2.0).is_none());
        assert_eq!(waveform.slice_seconds(-1.0, 0.25).unwrap().len(), 4000);
        assert!((waveform.duration() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_file_resamples_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.wav");
        let output = dir.path().join("raw_processed.wav");
        let raw: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f32::consts::PI * 300.0 * i as f32 / 22050.0).sin() * 0.3)
            .collect();
        file_io::write_wav(&input, &raw, 22050).unwrap();

        let waveform = SignalNormalizer::default()
            .normalize_file(&input, &output)
            .unwrap();

        assert_eq!(waveform.sample_rate(), CANONICAL_SAMPLE_RATE);
        assert!((waveform.duration() - 1.0).abs() < 0.01);
        let peak = waveform.samples().iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!((peak - DEFAULT_HEADROOM).abs() < 1e-4);

        let reloaded = file_io::load_audio_file(&output).unwrap();
        assert_eq!(reloaded.sample_rate, CANONICAL_SAMPLE_RATE);
        assert_eq!(reloaded.samples.len(), waveform.len());
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SignalNormalizer::default()
            .normalize_file(&dir.path().join("missing.flac"), &dir.path().join("out.wav"))
            .unwrap_err();
        assert!(err.is_decode());
    }
}
