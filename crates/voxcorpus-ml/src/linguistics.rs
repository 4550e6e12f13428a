//! Text features for transcripts
//!
//! Pure functions over transcript text and duration: speaking rate, filler
//! usage, lexicon polarity, and a few readability statistics. Segment
//! training priority is derived here as well.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// English filler words and phrases
pub const DEFAULT_FILLER_LEXICON: &[&str] = &[
    "um", "uh", "er", "ah", "like", "you know", "i mean", "basically", "actually",
    "literally", "honestly", "frankly", "obviously", "clearly", "simply", "just", "sort of",
    "kind of", "right", "well", "so", "okay", "ok", "yeah", "yep", "nope", "no", "anyway",
    "anyways", "whatever", "you see", "i guess", "i think", "i believe", "i suppose", "i say",
];

/// Word polarities in [-1, 1]
const POLARITY: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fine", 0.4),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("interesting", 0.5),
    ("love", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleasant", 0.73),
    ("positive", 0.23),
    ("wonderful", 1.0),
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("difficult", -0.5),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("negative", -0.3),
    ("poor", -0.4),
    ("sad", -0.5),
    ("sorry", -0.5),
    ("terrible", -1.0),
    ("ugly", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

const NEGATORS: &[&str] = &["not", "no", "never", "nothing", "hardly", "cannot"];

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "incredibly",
    "absolutely",
    "totally",
];

const INTENSIFIER_SCALE: f64 = 1.3;
const NEGATION_SCALE: f64 = -0.5;

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"))
}

fn sentiment_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z]+(?:'[a-z]+)?").expect("valid token regex"))
}

fn sentence_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("valid sentence regex"))
}

/// Lowercased words with punctuation treated as whitespace
pub fn words(text: &str) -> Vec<String> {
    non_word_regex()
        .replace_all(text, " ")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Filler words and multi-word filler phrases
#[derive(Debug, Clone)]
pub struct FillerLexicon {
    entries: HashSet<String>,
    longest: usize,
}

impl Default for FillerLexicon {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_LEXICON.iter().copied())
    }
}

impl FillerLexicon {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: HashSet<String> = entries
            .into_iter()
            .map(|e| words(e.as_ref()).join(" "))
            .filter(|e| !e.is_empty())
            .collect();
        let longest = entries
            .iter()
            .map(|e| e.split(' ').count())
            .max()
            .unwrap_or(0);
        Self { entries, longest }
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.entries.contains(phrase)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any lexicon entry occurs as a whole-word sequence in `words`
    pub fn matches_any(&self, words: &[String]) -> bool {
        (1..=self.longest.min(words.len())).any(|n| {
            words
                .windows(n)
                .any(|window| self.entries.contains(&window.join(" ")))
        })
    }
}

/// Rate statistics for a transcript over a duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRate {
    pub wpm: f64,
    /// Syllables per minute, from vowel-group counts
    pub spm: f64,
    /// Terminal punctuation marks per minute
    pub pause_rate: f64,
    pub word_count: usize,
    pub syllable_count: usize,
    pub duration_minutes: f64,
}

/// Readability statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextComplexity {
    pub avg_word_length: f64,
    pub unique_word_ratio: f64,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    /// Simplified Flesch reading ease in [0, 100]
    pub readability_score: f64,
}

/// Every text feature of one transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinguisticFeatures {
    pub wpm: f64,
    pub filler_ratio: f64,
    pub sentiment_score: f64,
    pub speech_rate: SpeechRate,
    pub complexity: TextComplexity,
    pub word_count: usize,
}

/// Computes text features with a configurable filler lexicon
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    fillers: FillerLexicon,
}

impl FeatureExtractor {
    pub fn new(fillers: FillerLexicon) -> Self {
        Self { fillers }
    }

    pub fn fillers(&self) -> &FillerLexicon {
        &self.fillers
    }

    /// Words per minute, rounded to 2 decimals
    pub fn wpm(&self, text: &str, duration: f64) -> f64 {
        if text.is_empty() || duration <= 0.0 {
            return 0.0;
        }
        round_to(words(text).len() as f64 / (duration / 60.0), 2)
    }

    /// Fraction of words that are fillers or start a filler bigram, rounded
    /// to 4 decimals
    pub fn filler_ratio(&self, text: &str) -> f64 {
        let words = words(text);
        if words.is_empty() {
            return 0.0;
        }

        let filler_count = words
            .iter()
            .enumerate()
            .filter(|(i, word)| {
                self.fillers.contains(word)
                    || words
                        .get(i + 1)
                        .is_some_and(|next| self.fillers.contains(&format!("{} {}", word, next)))
            })
            .count();

        round_to(filler_count as f64 / words.len() as f64, 4)
    }

    /// Mean lexicon polarity in [-1, 1], rounded to 3 decimals. A negator
    /// before a polar word flips and halves it; an intensifier scales it.
    pub fn sentiment(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = sentiment_token_regex()
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let is_negator = |t: &str| NEGATORS.contains(&t) || t.ends_with("n't");

        let mut scores = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            let Some(&(_, polarity)) = POLARITY.iter().find(|(w, _)| w == token) else {
                continue;
            };

            let mut score = polarity;
            let mut lookback = i;
            if i > 0 && INTENSIFIERS.contains(&tokens[i - 1]) {
                score = (score * INTENSIFIER_SCALE).clamp(-1.0, 1.0);
                lookback -= 1;
            }
            if lookback > 0 && is_negator(tokens[lookback - 1]) {
                score *= NEGATION_SCALE;
            }
            scores.push(score);
        }

        if scores.is_empty() {
            return 0.0;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        round_to(mean.clamp(-1.0, 1.0), 3)
    }

    pub fn speech_rate(&self, text: &str, duration: f64) -> SpeechRate {
        let word_count = words(text).len();
        let syllable_count = count_syllables(text);
        let pause_count = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
        let minutes = duration / 60.0;

        let per_minute = |count: usize| {
            if minutes > 0.0 {
                round_to(count as f64 / minutes, 2)
            } else {
                0.0
            }
        };

        SpeechRate {
            wpm: per_minute(word_count),
            spm: per_minute(syllable_count),
            pause_rate: per_minute(pause_count),
            word_count,
            syllable_count,
            duration_minutes: round_to(minutes, 2),
        }
    }

    pub fn complexity(&self, text: &str) -> TextComplexity {
        let words = words(text);
        if words.is_empty() {
            return TextComplexity::default();
        }

        let sentence_count = sentence_break_regex()
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .count();

        let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
        let avg_word_length = total_chars as f64 / words.len() as f64;
        let unique: HashSet<&String> = words.iter().collect();
        let avg_sentence_length = if sentence_count > 0 {
            words.len() as f64 / sentence_count as f64
        } else {
            0.0
        };
        let readability = if sentence_count > 0 {
            (206.835 - 1.015 * avg_sentence_length - 84.6 * avg_word_length).clamp(0.0, 100.0)
        } else {
            0.0
        };

        TextComplexity {
            avg_word_length: round_to(avg_word_length, 2),
            unique_word_ratio: round_to(unique.len() as f64 / words.len() as f64, 3),
            sentence_count,
            avg_sentence_length: round_to(avg_sentence_length, 2),
            readability_score: round_to(readability, 2),
        }
    }

    pub fn extract_all(&self, text: &str, duration: f64) -> LinguisticFeatures {
        let speech_rate = self.speech_rate(text, duration);
        LinguisticFeatures {
            wpm: self.wpm(text, duration),
            filler_ratio: self.filler_ratio(text),
            sentiment_score: self.sentiment(text),
            speech_rate,
            complexity: self.complexity(text),
            word_count: speech_rate.word_count,
        }
    }
}

/// Vowel groups in the whole text, at least 1
fn count_syllables(text: &str) -> usize {
    let mut count = 0;
    let mut on_vowel = false;
    for c in text.to_lowercase().chars() {
        let is_vowel = "aeiouy".contains(c);
        if is_vowel && !on_vowel {
            count += 1;
        }
        on_vowel = is_vowel;
    }
    count.max(1)
}

/// Ranking scalar for persisted segments: quality plus bonuses for a normal
/// speaking rate, few fillers and a reasonable length, capped at 1.
pub fn training_priority(quality_score: f64, wpm: f64, filler_ratio: f64, text: &str) -> f64 {
    let mut priority = quality_score;
    if wpm > 0.0 && wpm < 200.0 {
        priority += 0.1;
    }
    if filler_ratio < 0.1 {
        priority += 0.1;
    }
    if text.split_whitespace().count() >= 5 {
        priority += 0.1;
    }
    priority.min(1.0)
}
