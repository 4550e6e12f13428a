//! Segment quality assessment
//!
//! Five descriptors (RMS volume, spectral flatness, spectral contrast,
//! zero-crossing rate, spectral centroid) are fused into one bounded score.
//! Assessment is a pure function of the samples, the sample rate and the
//! policy.

use crate::error::AssessmentFailure;
use crate::spectral::{self, Stft, HOP_LENGTH, N_FFT};
use voxcorpus_types::{CandidateSegment, QualityMetrics, ScoredSegment, SelectionPolicy};

/// Shortest segment the frame analysis accepts
pub const MIN_ANALYSIS_SAMPLES: usize = HOP_LENGTH;

/// Fuse descriptors into a score in `[0, 1]`.
///
/// Weights: volume 0.3 (saturating at RMS 0.1), noise 0.3, contrast 0.2
/// (saturating at 2 dB), a flat 0.1 for a centroid inside 30 Hz..=15 kHz,
/// and 0.1 for a low zero-crossing rate.
pub fn fuse_quality_score(
    volume: f64,
    noise_ratio: f64,
    snr_estimate: f64,
    zero_crossing_rate: f64,
    spectral_centroid: f64,
) -> f64 {
    let volume_score = (volume / 0.1).min(1.0) * 0.3;
    let noise_score = (1.0 - noise_ratio * 0.8).max(0.0) * 0.3;
    let snr_score = (snr_estimate / 2.0).min(1.0) * 0.2;
    let freq_score = if (30.0..=15000.0).contains(&spectral_centroid) {
        0.1
    } else {
        0.0
    };
    let zcr_score = (1.0 - zero_crossing_rate * 2.0).max(0.0) * 0.1;

    (volume_score + noise_score + snr_score + freq_score + zcr_score).clamp(0.0, 1.0)
}

/// Scores segments against a fixed policy
#[derive(Debug, Default)]
pub struct QualityAssessor {
    policy: SelectionPolicy,
    stft: Stft,
}

impl QualityAssessor {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            stft: Stft::default(),
        }
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Compute all descriptors and the fused score for one segment
    pub fn assess(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<QualityMetrics, AssessmentFailure> {
        if sample_rate == 0 {
            return Err(AssessmentFailure::InvalidSampleRate(sample_rate));
        }
        if samples.len() < MIN_ANALYSIS_SAMPLES {
            return Err(AssessmentFailure::TooShort {
                samples: samples.len(),
                required: MIN_ANALYSIS_SAMPLES,
            });
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(AssessmentFailure::NonFinite);
        }

        let samples: Vec<f64> = samples.iter().map(|&s| s as f64).collect();

        let volume = spectral::rms(&samples);
        let volume_db = 20.0 * (volume + 1e-10).log10();

        let magnitude = self.stft.magnitude(&samples)?;
        let freqs = spectral::fft_frequencies(sample_rate, self.stft.n_fft());

        let noise_ratio = spectral::spectral_flatness(&magnitude).mean().unwrap_or(1.0);
        let snr_estimate = spectral::spectral_contrast(&magnitude, &freqs, sample_rate)?
            .mean()
            .unwrap_or(0.0);
        let spectral_centroid = spectral::spectral_centroid(&magnitude, &freqs)
            .mean()
            .unwrap_or(0.0);

        let zcr = spectral::zero_crossing_rate(&samples, N_FFT, HOP_LENGTH);
        let zero_crossing_rate = if zcr.is_empty() {
            0.0
        } else {
            zcr.iter().sum::<f64>() / zcr.len() as f64
        };

        let quality_score = fuse_quality_score(
            volume,
            noise_ratio,
            snr_estimate,
            zero_crossing_rate,
            spectral_centroid,
        );

        Ok(QualityMetrics {
            volume,
            volume_db,
            noise_ratio,
            snr_estimate,
            zero_crossing_rate,
            spectral_centroid,
            quality_score,
            is_acceptable: quality_score >= self.policy.min_quality_score,
        })
    }

    /// Like [`assess`](Self::assess), substituting the sentinel on failure
    pub fn assess_or_sentinel(&self, samples: &[f32], sample_rate: u32) -> QualityMetrics {
        or_sentinel(self.assess(samples, sample_rate))
    }

    /// Attach metrics to a candidate, recording whether the sentinel was used
    pub fn score(&self, segment: CandidateSegment) -> ScoredSegment {
        let outcome = self.assess(&segment.samples, segment.sample_rate);
        let assessment_failed = outcome.is_err();
        let metrics = or_sentinel(outcome);
        tracing::debug!(
            "Segment {} ({:.2}s-{:.2}s): quality {:.3}{}",
            segment.index,
            segment.start_time,
            segment.end_time,
            metrics.quality_score,
            if assessment_failed { " (sentinel)" } else { "" }
        );
        ScoredSegment {
            segment,
            metrics,
            assessment_failed,
        }
    }
}

fn or_sentinel(outcome: Result<QualityMetrics, AssessmentFailure>) -> QualityMetrics {
    outcome.unwrap_or_else(|e| {
        tracing::warn!("Quality assessment failed, using sentinel metrics: {}", e);
        QualityMetrics::sentinel()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / 16000.0).sin() * amplitude)
            .collect()
    }

    fn noise(len: usize, seed: u64) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }

    /// Tone plus noise, rescaled to a fixed RMS so only the mix changes
    fn noisy_tone(noise_amplitude: f32) -> Vec<f32> {
        let clean = tone(220.0, 16000, 1.0);
        let hiss = noise(16000, 11);
        let mixed: Vec<f32> = clean
            .iter()
            .zip(&hiss)
            .map(|(c, n)| c + n * noise_amplitude)
            .collect();
        let rms = (mixed.iter().map(|x| x * x).sum::<f32>() / mixed.len() as f32).sqrt();
        mixed.iter().map(|x| x * 0.2 / rms).collect()
    }

    #[test]
    fn test_fusion_components() {
        // Perfect input on every axis
        assert!((fuse_quality_score(0.2, 0.0, 10.0, 0.0, 1000.0) - 1.0).abs() < 1e-12);
        // Sentinel descriptors still earn the partial noise component
        let floor = fuse_quality_score(0.0, 1.0, 0.0, 0.0, 0.0);
        assert!((floor - 0.06 - 0.1).abs() < 1e-12);
        // Centroid bonus boundaries are inclusive
        let at_edge = fuse_quality_score(0.0, 1.0, 0.0, 1.0, 30.0);
        let below = fuse_quality_score(0.0, 1.0, 0.0, 1.0, 29.9);
        assert!((at_edge - below - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_scores_are_bounded() {
        let assessor = QualityAssessor::default();
        for signal in [
            tone(440.0, 16000, 0.8),
            noise(16000, 1),
            vec![0.0; 4000],
            tone(7000.0, 8000, 1.0),
        ] {
            let m = assessor.assess(&signal, 16000).unwrap();
            assert!((0.0..=1.0).contains(&m.quality_score));
            assert!((0.0..=1.0).contains(&m.noise_ratio));
            assert!(m.volume >= 0.0);
            assert!(m.snr_estimate >= 0.0);
        }
    }

    #[test]
    fn test_centroid_positive_on_non_silent_input() {
        let m = QualityAssessor::default()
            .assess(&tone(300.0, 16000, 0.5), 16000)
            .unwrap();
        assert!(m.spectral_centroid > 0.0);
    }

    #[test]
    fn test_more_noise_lowers_score() {
        let assessor = QualityAssessor::default();
        let scores: Vec<f64> = [0.0, 0.2, 0.6, 1.5, 4.0]
            .iter()
            .map(|&a| assessor.assess(&noisy_tone(a), 16000).unwrap().quality_score)
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[1] < pair[0], "scores not decreasing: {:?}", scores);
        }
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let assessor = QualityAssessor::default();
        let signal = noisy_tone(0.3);
        let a = assessor.assess(&signal, 16000).unwrap();
        let b = assessor.assess(&signal, 16000).unwrap();
        assert_eq!(a.quality_score.to_bits(), b.quality_score.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn test_acceptance_matches_policy() {
        let signal = noisy_tone(0.5);
        for min_quality_score in [0.0, 0.3, 0.6, 0.9, 1.0] {
            let assessor = QualityAssessor::new(SelectionPolicy {
                min_quality_score,
                ..Default::default()
            });
            let m = assessor.assess(&signal, 16000).unwrap();
            assert_eq!(m.is_acceptable, m.quality_score >= min_quality_score);
        }
    }

    #[test]
    fn test_failures_are_reported() {
        let assessor = QualityAssessor::default();
        assert_eq!(
            assessor.assess(&[0.1; 100], 16000),
            Err(AssessmentFailure::TooShort {
                samples: 100,
                required: MIN_ANALYSIS_SAMPLES
            })
        );
        let mut bad = tone(440.0, 4000, 0.5);
        bad[10] = f32::NAN;
        assert_eq!(assessor.assess(&bad, 16000), Err(AssessmentFailure::NonFinite));
        assert!(matches!(
            assessor.assess(&tone(440.0, 4000, 0.5), 8000),
            Err(AssessmentFailure::BandExceedsNyquist { .. })
        ));
        assert_eq!(assessor.assess_or_sentinel(&[], 16000), QualityMetrics::sentinel());
    }

    #[test]
    fn test_score_marks_sentinel_segments() {
        let assessor = QualityAssessor::default();
        let segment = CandidateSegment {
            index: 4,
            start_time: 1.0,
            end_time: 1.001,
            duration: 0.001,
            transcript: String::new(),
            samples: vec![0.2; 16],
            sample_rate: 16000,
        };
        let scored = assessor.score(segment);
        assert!(scored.assessment_failed);
        assert_eq!(scored.quality_score(), 0.0);
        assert_eq!(scored.segment.index, 4);
    }

    #[test]
    fn test_score_and_assess_agree_on_failure() {
        let assessor = QualityAssessor::default();
        let samples = vec![0.2; 16];
        let fallback = assessor.assess_or_sentinel(&samples, 16000);
        let scored = assessor.score(CandidateSegment {
            index: 0,
            start_time: 0.0,
            end_time: 0.001,
            duration: 0.001,
            transcript: String::new(),
            samples: samples.clone(),
            sample_rate: 16000,
        });
        assert!(scored.assessment_failed);
        assert_eq!(scored.metrics, fallback);

        let speech = tone(440.0, 16000, 0.5);
        let scored = assessor.score(CandidateSegment {
            index: 1,
            start_time: 0.0,
            end_time: 1.0,
            duration: 1.0,
            transcript: String::new(),
            samples: speech.clone(),
            sample_rate: 16000,
        });
        assert!(!scored.assessment_failed);
        assert_eq!(scored.metrics, assessor.assess_or_sentinel(&speech, 16000));
    }
}
