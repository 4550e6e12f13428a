//! Structural completeness check for transcript text

use crate::linguistics::{self, FillerLexicon};

const MIN_CHARS: usize = 10;
const MIN_WORDS: usize = 3;
/// Utterances this short that contain a filler are treated as filler-only
const FILLER_ONLY_MAX_WORDS: usize = 2;

/// Rejects fragments and filler-only utterances. Independent of acoustics.
#[derive(Debug, Clone, Default)]
pub struct SentenceGate {
    fillers: FillerLexicon,
}

impl SentenceGate {
    pub fn new(fillers: FillerLexicon) -> Self {
        Self { fillers }
    }

    pub fn is_complete(&self, text: &str) -> bool {
        let text = text.trim();

        if text.chars().count() < MIN_CHARS {
            return false;
        }
        if !text.chars().next().is_some_and(char::is_uppercase) {
            return false;
        }
        if !text.ends_with(['.', '!', '?']) {
            return false;
        }

        let word_count = text.split_whitespace().count();
        if word_count < MIN_WORDS {
            return false;
        }

        if word_count <= FILLER_ONLY_MAX_WORDS
            && self.fillers.matches_any(&linguistics::words(text))
        {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_complete_sentence() {
        let gate = SentenceGate::default();
        assert!(gate.is_complete("This is a complete sentence."));
        assert!(gate.is_complete("  Does this one count?  "));
    }

    #[test]
    fn test_rejects_fragments() {
        let gate = SentenceGate::default();
        assert!(!gate.is_complete("um uh"));
        assert!(!gate.is_complete("incomplete sentence"));
        assert!(!gate.is_complete("lowercase start is wrong."));
        assert!(!gate.is_complete("Two words."));
        assert!(!gate.is_complete("Short ok."));
        assert!(!gate.is_complete(""));
    }

    #[test]
    fn test_filler_fragments_rejected() {
        let gate = SentenceGate::default();
        assert!(!gate.is_complete("Basically, yeah."));
        assert!(!gate.is_complete("Um, actually!"));
    }

    #[test]
    fn test_longer_sentences_with_fillers_pass() {
        let gate = SentenceGate::default();
        assert!(gate.is_complete("I actually finished the whole report."));
        assert!(gate.is_complete("Well, you know, it was fine."));
    }

    #[test]
    fn test_custom_lexicon() {
        let gate = SentenceGate::new(FillerLexicon::new(["hmm"]));
        assert!(gate.is_complete("Hmm, that is odd."));
        assert!(!gate.is_complete("Hmm hmm."));
    }
}
