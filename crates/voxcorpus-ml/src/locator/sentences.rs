use super::{slice_candidate, SegmentLocator, SegmentationConfig};
use regex::Regex;
use std::sync::OnceLock;
use voxcorpus_audio::Waveform;
use voxcorpus_types::{CandidateSegment, LocatorStrategy};

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]*[.!?]+|[^.!?]+$").expect("valid sentence regex"))
}

/// Split text into trimmed sentences, keeping terminal punctuation
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fallback for transcripts without timing.
///
/// The coarse transcript is split on `.`, `!` and `?` and each sentence gets
/// an equal share of the total duration. Segment boundaries are therefore an
/// approximation and will not line up with the actual speech.
#[derive(Debug, Clone)]
pub struct SentenceSplitLocator {
    text: String,
    config: SegmentationConfig,
}

impl SentenceSplitLocator {
    pub fn new(text: impl Into<String>, config: SegmentationConfig) -> Self {
        Self {
            text: text.into(),
            config,
        }
    }
}

impl SegmentLocator for SentenceSplitLocator {
    fn strategy(&self) -> LocatorStrategy {
        LocatorStrategy::SentenceSplit
    }

    fn locate(&self, waveform: &Waveform) -> Vec<CandidateSegment> {
        let sentences = split_sentences(&self.text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let slice = waveform.duration() / sentences.len() as f64;
        if !self.config.accepts_duration(slice) {
            tracing::debug!(
                "Sentence slices of {:.2}s fall outside the duration window",
                slice
            );
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for (i, sentence) in sentences.into_iter().enumerate() {
            let start = i as f64 * slice;
            let end = (i + 1) as f64 * slice;
            if let Some(candidate) = slice_candidate(waveform, candidates.len(), start, end, sentence)
            {
                candidates.push(candidate);
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_punctuation() {
        assert_eq!(
            split_sentences("Hello there. How are you?  Fine!! trailing bit"),
            vec!["Hello there.", "How are you?", "Fine!!", "trailing bit"]
        );
        assert!(split_sentences("   ").is_empty());
        assert!(split_sentences("...").len() == 1);
    }

    #[test]
    fn test_equal_slices() {
        let waveform = Waveform::new(vec![0.1; 9 * 16000], 16000);
        let locator = SentenceSplitLocator::new(
            "The first sentence is here. The second one follows. A third closes it.",
            SegmentationConfig::default(),
        );
        let candidates = locator.locate(&waveform);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[1].start_time, 3.0);
        assert_eq!(candidates[1].end_time, 6.0);
        assert_eq!(candidates[1].transcript, "The second one follows.");
        assert_eq!(candidates[2].index, 2);
        assert_eq!(locator.strategy(), LocatorStrategy::SentenceSplit);
    }

    #[test]
    fn test_slices_outside_window_are_dropped() {
        let waveform = Waveform::new(vec![0.1; 16000], 16000);
        let locator =
            SentenceSplitLocator::new("One. Two. Three. Four.", SegmentationConfig::default());
        assert!(locator.locate(&waveform).is_empty());
    }
}
