use super::{slice_candidate, SegmentLocator, SegmentationConfig};
use voxcorpus_audio::Waveform;
use voxcorpus_types::{CandidateSegment, LocatorStrategy, TranscriptUtterance};

/// Slices the waveform at utterance timestamps from the transcription source.
///
/// Overlapping utterances are not merged; each becomes its own candidate.
#[derive(Debug, Clone)]
pub struct TimestampLocator {
    utterances: Vec<TranscriptUtterance>,
    config: SegmentationConfig,
}

impl TimestampLocator {
    pub fn new(utterances: Vec<TranscriptUtterance>, config: SegmentationConfig) -> Self {
        Self { utterances, config }
    }
}

impl SegmentLocator for TimestampLocator {
    fn strategy(&self) -> LocatorStrategy {
        LocatorStrategy::Timestamps
    }

    fn locate(&self, waveform: &Waveform) -> Vec<CandidateSegment> {
        let mut candidates = Vec::new();

        for utterance in &self.utterances {
            let duration = utterance.duration();
            if duration <= 0.0 || !self.config.accepts_duration(duration) {
                tracing::debug!(
                    "Skipping utterance {:.2}s-{:.2}s: duration {:.2}s outside window",
                    utterance.start,
                    utterance.end,
                    duration
                );
                continue;
            }

            let index = candidates.len();
            match slice_candidate(
                waveform,
                index,
                utterance.start,
                utterance.end,
                utterance.text.trim().to_string(),
            ) {
                Some(candidate) => candidates.push(candidate),
                None => tracing::debug!(
                    "Skipping utterance at {:.2}s: starts past end of audio",
                    utterance.start
                ),
            }
        }

        candidates
    }
}
