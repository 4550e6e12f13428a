//! Candidate segment locators
//!
//! Every strategy turns the canonical waveform into an ordered list of
//! [`CandidateSegment`]s without metrics. Indices are assigned in emission
//! order, starting at 0 with no gaps.

mod energy;
mod sentences;
mod timestamp;

pub use energy::EnergyLocator;
pub use sentences::{split_sentences, SentenceSplitLocator};
pub use timestamp::TimestampLocator;

use serde::{Deserialize, Serialize};
use voxcorpus_audio::Waveform;
use voxcorpus_types::{CandidateSegment, LocatorStrategy};

/// Segmentation settings shared by all locators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmentationConfig {
    /// Shortest kept segment in seconds (inclusive)
    pub min_segment_length: f64,
    /// Longest kept segment in seconds (inclusive)
    pub max_segment_length: f64,
    /// Energy analysis frame in milliseconds
    pub energy_frame_ms: u32,
    /// Energy analysis hop in milliseconds
    pub energy_hop_ms: u32,
    /// Z-score above which an energy frame counts as active
    pub energy_threshold: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_segment_length: 1.0,
            max_segment_length: 30.0,
            energy_frame_ms: 25,
            energy_hop_ms: 10,
            energy_threshold: 0.5,
        }
    }
}

impl SegmentationConfig {
    pub fn accepts_duration(&self, duration: f64) -> bool {
        duration >= self.min_segment_length && duration <= self.max_segment_length
    }
}

/// Produces candidate segments from a waveform
pub trait SegmentLocator: Send + Sync {
    /// Strategy reported to callers
    fn strategy(&self) -> LocatorStrategy;

    /// Locate candidates in the waveform
    fn locate(&self, waveform: &Waveform) -> Vec<CandidateSegment>;
}

/// Slice `[start, end)` seconds into a candidate, or `None` when the slice
/// falls outside the waveform.
fn slice_candidate(
    waveform: &Waveform,
    index: usize,
    start: f64,
    end: f64,
    transcript: String,
) -> Option<CandidateSegment> {
    let samples = waveform.slice_seconds(start, end)?;
    Some(CandidateSegment {
        index,
        start_time: start,
        end_time: end,
        duration: end - start,
        transcript,
        samples: samples.to_vec(),
        sample_rate: waveform.sample_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_window_is_inclusive() {
        let config = SegmentationConfig::default();
        assert!(config.accepts_duration(1.0));
        assert!(config.accepts_duration(30.0));
        assert!(!config.accepts_duration(0.5));
        assert!(!config.accepts_duration(30.01));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SegmentationConfig =
            serde_json::from_str(r#"{"minSegmentLength": 2.5}"#).unwrap();
        assert_eq!(config.min_segment_length, 2.5);
        assert_eq!(config.max_segment_length, 30.0);
        assert_eq!(config.energy_hop_ms, 10);
    }

    #[test]
    fn test_slice_candidate_outside_waveform() {
        let waveform = Waveform::new(vec![0.0; 16000], 16000);
        assert!(slice_candidate(&waveform, 0, 2.0, 3.0, String::new()).is_none());
        let c = slice_candidate(&waveform, 3, 0.5, 1.5, "Hi.".into()).unwrap();
        assert_eq!(c.samples.len(), 8000);
        assert_eq!(c.duration, 1.0);
        assert_eq!(c.index, 3);
    }
}
