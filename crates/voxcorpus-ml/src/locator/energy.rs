use super::{slice_candidate, SegmentLocator, SegmentationConfig};
use voxcorpus_audio::Waveform;
use voxcorpus_types::{CandidateSegment, LocatorStrategy};

/// Acoustic-only segmentation by short-time energy.
///
/// Frame energies are z-scored over the whole clip; frames above the
/// threshold are active and contiguous active runs become segments. A run
/// still active at the end of the clip closes at the clip boundary.
/// Candidates carry no transcript.
#[derive(Debug, Clone, Default)]
pub struct EnergyLocator {
    config: SegmentationConfig,
}

impl EnergyLocator {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Active regions as `(start, end)` seconds, before the duration filter
    pub fn active_regions(&self, samples: &[f32], sample_rate: u32) -> Vec<(f64, f64)> {
        let frame_length = (sample_rate as u64 * self.config.energy_frame_ms as u64 / 1000) as usize;
        let hop_length = (sample_rate as u64 * self.config.energy_hop_ms as u64 / 1000) as usize;
        if frame_length == 0 || hop_length == 0 || samples.len() <= frame_length {
            return Vec::new();
        }

        let energy: Vec<f64> = (0..samples.len() - frame_length)
            .step_by(hop_length)
            .map(|i| {
                samples[i..i + frame_length]
                    .iter()
                    .map(|&s| (s as f64) * (s as f64))
                    .sum()
            })
            .collect();

        let n = energy.len() as f64;
        let mean = energy.iter().sum::<f64>() / n;
        let std = (energy.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n).sqrt();
        // Identical frames leave only rounding noise in the deviation
        if !std.is_finite() || std <= mean.abs() * 1e-9 {
            return Vec::new();
        }

        let rate = sample_rate as f64;
        let mut regions = Vec::new();
        let mut run_start: Option<f64> = None;

        for (i, e) in energy.iter().enumerate() {
            let active = (e - mean) / std > self.config.energy_threshold;
            let time = (i * hop_length) as f64 / rate;
            match (active, run_start) {
                (true, None) => run_start = Some(time),
                (false, Some(start)) => {
                    regions.push((start, time));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            regions.push((start, samples.len() as f64 / rate));
        }

        regions
    }
}

impl SegmentLocator for EnergyLocator {
    fn strategy(&self) -> LocatorStrategy {
        LocatorStrategy::Energy
    }

    fn locate(&self, waveform: &Waveform) -> Vec<CandidateSegment> {
        let regions = self.active_regions(waveform.samples(), waveform.sample_rate());
        tracing::debug!("Energy analysis found {} active regions", regions.len());

        let mut candidates = Vec::new();
        for (start, end) in regions {
            if !self.config.accepts_duration(end - start) {
                continue;
            }
            if let Some(candidate) =
                slice_candidate(waveform, candidates.len(), start, end, String::new())
            {
                candidates.push(candidate);
            }
        }

        candidates
    }
}
