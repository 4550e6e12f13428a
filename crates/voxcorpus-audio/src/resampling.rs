//! Audio resampling using rubato

use crate::error::{AudioError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample mono audio from source_rate to target_rate with a band-limited
/// sinc interpolator. The output is aligned with the input (filter delay
/// removed) and has `ceil(len * target / source)` samples.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == 0 || target_rate == 0 {
        return Err(AudioError::processing(
            "resampling",
            format!("invalid rates {} -> {}", source_rate, target_rate),
        ));
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0,
        params,
        samples.len(),
        1, // mono
    )
    .map_err(|e| AudioError::processing("resampling", e))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).ceil() as usize;

    let input = vec![samples.to_vec()];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| AudioError::processing("resampling", e))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the filter tail so the end of the signal is not lost
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| AudioError::processing("resampling", e))?
        .into_iter()
        .next()
        .unwrap_or_default();
    output.extend(tail);

    let aligned: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();

    tracing::debug!(
        "Resampled {} samples {} Hz -> {} samples {} Hz",
        samples.len(),
        source_rate,
        aligned.len(),
        target_rate
    );

    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        (0..(rate as f32 * seconds) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_same_rate_is_identity() {
        let samples = tone(440.0, 16000, 0.1);
        assert_eq!(resample(&samples, 16000, 16000).unwrap(), samples);
    }

    #[test]
    fn test_downsample_length_and_energy() {
        let samples = tone(440.0, 48000, 1.0);
        let out = resample(&samples, 48000, 16000).unwrap();

        assert!(out.len() <= 16000);
        assert!(out.len() >= 15900);

        // A 440 Hz tone is well inside the passband, RMS should survive
        let mid = &out[2000..14000];
        let rms = (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt();
        assert!((rms - 0.5 / 2f32.sqrt()).abs() < 0.02, "rms = {}", rms);
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(resample(&[0.0; 10], 0, 16000).is_err());
    }
}
