//! Analysis crate for voxcorpus
//!
//! Spectral descriptors and quality scoring, candidate segment location,
//! sentence gating, corpus selection, transcript text features, and the
//! pipeline that ties them together.

pub mod error;
pub mod linguistics;
pub mod locator;
pub mod pipeline;
pub mod quality;
pub mod selector;
pub mod sentence_gate;
pub mod spectral;
pub mod traits;
pub mod transcript;

pub use error::{AssessmentFailure, PipelineError};
pub use linguistics::{
    training_priority, FeatureExtractor, FillerLexicon, LinguisticFeatures, SpeechRate,
    TextComplexity, DEFAULT_FILLER_LEXICON,
};
pub use locator::{
    split_sentences, EnergyLocator, SegmentLocator, SegmentationConfig, SentenceSplitLocator,
    TimestampLocator,
};
pub use pipeline::{CorpusPipeline, CorpusRun, HIGH_QUALITY_SCORE};
pub use quality::{fuse_quality_score, QualityAssessor, MIN_ANALYSIS_SAMPLES};
pub use selector::{percentile, CorpusSelector, SelectionOutcome};
pub use sentence_gate::SentenceGate;
pub use traits::TranscriptionEngine;
pub use transcript::{parse_transcript_json, FixedTranscript, SidecarTranscript};
