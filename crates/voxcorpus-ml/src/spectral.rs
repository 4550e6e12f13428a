//! Short-time spectral and temporal descriptors
//!
//! Frame layout and formulas follow the conventions used by librosa's
//! feature extractors so scores stay comparable with corpora built by that
//! toolchain: 2048-point periodic Hann STFT, hop 512, centered with zero
//! padding, magnitudes (not power) in the spectrogram.

use crate::error::AssessmentFailure;
use ndarray::{s, Array1, Array2, Axis};
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

/// FFT size and frame length
pub const N_FFT: usize = 2048;
/// Hop between frames in samples
pub const HOP_LENGTH: usize = 512;
/// Floor applied before logarithms
pub const AMIN: f64 = 1e-10;
/// Dynamic range kept by [`power_to_db`]
pub const TOP_DB: f64 = 80.0;

/// Lower edge of the first contrast octave
pub const CONTRAST_FMIN: f64 = 200.0;
/// Number of contrast octaves above the base band
pub const CONTRAST_BANDS: usize = 6;
/// Fraction of each band averaged for peak and valley
pub const CONTRAST_QUANTILE: f64 = 0.02;

/// Samples with magnitude at or below this count as zero for crossings
const ZERO_CROSSING_THRESHOLD: f64 = 1e-10;

/// Centered STFT with a periodic Hann window
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f64>,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .finish()
    }
}

impl Default for Stft {
    fn default() -> Self {
        Self::new(N_FFT, HOP_LENGTH)
    }
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let window = (0..n_fft)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n_fft as f64).cos())
            .collect();

        Self {
            n_fft,
            hop_length,
            window,
            fft,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames produced for `len` input samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Magnitude spectrogram, shape `(n_bins, n_frames)`
    pub fn magnitude(&self, samples: &[f64]) -> Result<Array2<f64>, AssessmentFailure> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = 1 + (padded.len() - self.n_fft) / self.hop_length;
        let mut spec = Array2::<f64>::zeros((self.n_bins(), n_frames));

        let mut input = self.fft.make_input_vec();
        let mut output = self.fft.make_output_vec();

        for frame in 0..n_frames {
            let start = frame * self.hop_length;
            let chunk = &padded[start..start + self.n_fft];
            for ((dst, &x), &w) in input.iter_mut().zip(chunk).zip(&self.window) {
                *dst = x * w;
            }

            self.fft
                .process(&mut input, &mut output)
                .map_err(|e| AssessmentFailure::Fft(e.to_string()))?;

            for (bin, c) in output.iter().enumerate() {
                spec[[bin, frame]] = c.norm();
            }
        }

        Ok(spec)
    }
}

/// Center frequency of each STFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    (0..=n_fft / 2)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect()
}

/// Root-mean-square amplitude of the whole slice
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Per-frame ratio of geometric to arithmetic mean of the power spectrum
pub fn spectral_flatness(magnitude: &Array2<f64>) -> Array1<f64> {
    magnitude
        .axis_iter(Axis(1))
        .map(|frame| {
            let n = frame.len() as f64;
            let (log_sum, sum) = frame.iter().fold((0.0, 0.0), |(l, s), &m| {
                let p = (m * m).max(AMIN);
                (l + p.ln(), s + p)
            });
            ((log_sum / n).exp() / (sum / n)).min(1.0)
        })
        .collect()
}

/// Per-frame magnitude-weighted mean frequency. Silent frames yield 0.
pub fn spectral_centroid(magnitude: &Array2<f64>, freqs: &[f64]) -> Array1<f64> {
    magnitude
        .axis_iter(Axis(1))
        .map(|frame| {
            let total: f64 = frame.sum();
            if total <= f64::MIN_POSITIVE {
                return 0.0;
            }
            frame.iter().zip(freqs).map(|(m, f)| m * f).sum::<f64>() / total
        })
        .collect()
}

/// Octave-band peak/valley difference in dB, shape `(CONTRAST_BANDS + 1, n_frames)`
pub fn spectral_contrast(
    magnitude: &Array2<f64>,
    freqs: &[f64],
    sample_rate: u32,
) -> Result<Array2<f64>, AssessmentFailure> {
    let nyquist = sample_rate as f64 / 2.0;

    let mut octa = vec![0.0; CONTRAST_BANDS + 2];
    for (i, edge) in octa.iter_mut().enumerate().skip(1) {
        *edge = CONTRAST_FMIN * 2f64.powi(i as i32 - 1);
    }
    if let Some(&edge) = octa[..octa.len() - 1].iter().find(|&&f| f >= nyquist) {
        return Err(AssessmentFailure::BandExceedsNyquist {
            band_hz: edge,
            nyquist_hz: nyquist,
        });
    }

    let n_bins = magnitude.nrows();
    let n_frames = magnitude.ncols();
    let mut peak = Array2::<f64>::zeros((CONTRAST_BANDS + 1, n_frames));
    let mut valley = Array2::<f64>::zeros((CONTRAST_BANDS + 1, n_frames));
    let mut column = Vec::new();

    for k in 0..=CONTRAST_BANDS {
        let (f_low, f_high) = (octa[k], octa[k + 1]);
        let empty = AssessmentFailure::EmptyBand {
            low_hz: f_low,
            high_hz: f_high,
        };

        let mut in_band = freqs
            .iter()
            .enumerate()
            .filter(|(_, &f)| f >= f_low && f <= f_high)
            .map(|(i, _)| i);
        let first = in_band.next().ok_or_else(|| empty.clone())?;
        let last = in_band.last().unwrap_or(first);

        // Each band above the base one borrows its lower neighbour bin; the
        // top band runs to the end of the spectrum.
        let lo = if k > 0 { first.saturating_sub(1) } else { first };
        let hi = if k == CONTRAST_BANDS { n_bins - 1 } else { last };
        let count = hi - lo + 1;
        let sub_end = if k < CONTRAST_BANDS { hi } else { hi + 1 };
        if sub_end <= lo {
            return Err(empty);
        }

        let idx = ((CONTRAST_QUANTILE * count as f64).round_ties_even() as usize).max(1);

        for frame in 0..n_frames {
            column.clear();
            column.extend(magnitude.slice(s![lo..sub_end, frame]).iter().copied());
            column.sort_by(f64::total_cmp);

            let take = idx.min(column.len());
            valley[[k, frame]] = mean(&column[..take]);
            peak[[k, frame]] = mean(&column[column.len() - take..]);
        }
    }

    Ok(&power_to_db(&peak) - &power_to_db(&valley))
}

/// `10·log10(max(AMIN, x))`, floored at `max - TOP_DB` over the whole array
pub fn power_to_db(values: &Array2<f64>) -> Array2<f64> {
    let mut db = values.mapv(|v| 10.0 * v.max(AMIN).log10());
    let max = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let floor = max - TOP_DB;
    db.mapv_inplace(|v| v.max(floor));
    db
}

/// Per-frame fraction of sign changes. Edges are padded by repeating the
/// first and last sample.
pub fn zero_crossing_rate(samples: &[f64], frame_length: usize, hop_length: usize) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (samples.first(), samples.last()) else {
        return Vec::new();
    };

    let pad = frame_length / 2;
    let negative: Vec<bool> = std::iter::repeat(first)
        .take(pad)
        .chain(samples.iter().copied())
        .chain(std::iter::repeat(last).take(pad))
        .map(|x| x.abs() > ZERO_CROSSING_THRESHOLD && x.is_sign_negative())
        .collect();

    if negative.len() < frame_length {
        return Vec::new();
    }

    let n_frames = 1 + (negative.len() - frame_length) / hop_length;
    (0..n_frames)
        .map(|frame| {
            let start = frame * hop_length;
            let crossings = negative[start..start + frame_length]
                .windows(2)
                .filter(|pair| pair[0] != pair[1])
                .count();
            crossings as f64 / frame_length as f64
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
