//! Shared types for voxcorpus
//!
//! This crate contains the data structures passed between the audio,
//! analysis, worker and CLI crates. Everything here is plain data with
//! serde support; behavior lives in the crates that own it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Transcription Types
// ============================================================================

/// One timed utterance from the transcription source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptUtterance {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text
    pub text: String,
}

impl TranscriptUtterance {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Transcription result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    /// Full transcribed text
    pub text: String,
    /// Utterances with timestamps, ordered by start time. Empty when the
    /// source did not provide timing.
    #[serde(default)]
    pub utterances: Vec<TranscriptUtterance>,
    /// Detected language (ISO 639-1 code)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Audio duration reported by the source, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl TranscriptionResult {
    /// Text-only result without timing
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn has_timestamps(&self) -> bool {
        !self.utterances.is_empty()
    }
}

// ============================================================================
// Quality Types
// ============================================================================

/// Acoustic descriptors and the fused quality score of one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// RMS amplitude
    pub volume: f64,
    /// 20·log10(volume + 1e-10)
    pub volume_db: f64,
    /// Mean spectral flatness (0 tonal .. 1 noise-like)
    pub noise_ratio: f64,
    /// Mean spectral contrast in dB, used as an SNR proxy
    pub snr_estimate: f64,
    /// Mean zero-crossing rate
    pub zero_crossing_rate: f64,
    /// Mean spectral centroid in Hz
    pub spectral_centroid: f64,
    /// Fused score in [0, 1]
    pub quality_score: f64,
    /// `quality_score >= min_quality_score` at computation time
    pub is_acceptable: bool,
}

impl QualityMetrics {
    /// Worst-case metrics substituted when a segment cannot be analyzed
    pub fn sentinel() -> Self {
        Self {
            volume: 0.0,
            volume_db: -60.0,
            noise_ratio: 1.0,
            snr_estimate: 0.0,
            zero_crossing_rate: 0.0,
            spectral_centroid: 0.0,
            quality_score: 0.0,
            is_acceptable: false,
        }
    }
}

/// Selection thresholds, read-only for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionPolicy {
    /// RMS below this is reported as a low-volume issue
    pub min_volume_threshold: f64,
    /// Spectral flatness above this is reported as a noise issue
    pub max_noise_ratio: f64,
    /// Spectral contrast below this is reported as a low-SNR issue
    pub min_snr_threshold: f64,
    /// Acceptance bar for `is_acceptable` and the strict selection pass
    pub min_quality_score: f64,
    /// Number of segments the selector aims to return
    pub target_corpus_size: usize,
    /// Percentile of the full pool used when the strict pass starves
    pub fallback_percentile: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_volume_threshold: 0.0005,
            max_noise_ratio: 0.9,
            min_snr_threshold: 3.0,
            min_quality_score: 0.05,
            target_corpus_size: 50,
            fallback_percentile: 25.0,
        }
    }
}

/// Advisory findings on a segment's descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityIssue {
    LowVolume,
    Noisy,
    LowSnr,
}

impl SelectionPolicy {
    /// Descriptor-level issues for reporting. These never affect the score.
    pub fn issues(&self, metrics: &QualityMetrics) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        if metrics.volume < self.min_volume_threshold {
            issues.push(QualityIssue::LowVolume);
        }
        if metrics.noise_ratio > self.max_noise_ratio {
            issues.push(QualityIssue::Noisy);
        }
        if metrics.snr_estimate < self.min_snr_threshold {
            issues.push(QualityIssue::LowSnr);
        }
        issues
    }
}

// ============================================================================
// Segment Types
// ============================================================================

/// How candidate segments were located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocatorStrategy {
    /// Utterance timestamps from the transcription source
    Timestamps,
    /// Coarse transcript split on sentence punctuation with equal time
    /// slices. Timing is an approximation.
    SentenceSplit,
    /// Short-time energy above a z-score threshold, no transcript
    Energy,
}

impl std::fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocatorStrategy::Timestamps => write!(f, "timestamps"),
            LocatorStrategy::SentenceSplit => write!(f, "sentence-split"),
            LocatorStrategy::Energy => write!(f, "energy"),
        }
    }
}

/// Time-bounded slice of the canonical waveform with its transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSegment {
    /// Encounter order from the locator, 0-based
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    /// Transcript text, empty for acoustic-only segments
    pub transcript: String,
    /// Samples of the canonical waveform in `[start_time, end_time)`
    #[serde(skip)]
    pub samples: Vec<f32>,
    /// Sample rate of `samples`
    pub sample_rate: u32,
}

/// Candidate with its quality metrics attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSegment {
    #[serde(flatten)]
    pub segment: CandidateSegment,
    pub metrics: QualityMetrics,
    /// Metrics are the sentinel because analysis failed
    #[serde(default)]
    pub assessment_failed: bool,
}

impl ScoredSegment {
    pub fn quality_score(&self) -> f64 {
        self.metrics.quality_score
    }
}

/// Threshold the corpus selector actually applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AppliedThreshold {
    /// Policy minimum quality score
    Strict { threshold: f64 },
    /// Percentile of the full pool, used because the strict pass starved
    Relaxed { threshold: f64, percentile: f64 },
}

impl AppliedThreshold {
    pub fn value(&self) -> f64 {
        match self {
            AppliedThreshold::Strict { threshold } => *threshold,
            AppliedThreshold::Relaxed { threshold, .. } => *threshold,
        }
    }

    pub fn is_relaxed(&self) -> bool {
        matches!(self, AppliedThreshold::Relaxed { .. })
    }
}

// ============================================================================
// Record Types (persistence boundary)
// ============================================================================

/// File-level record emitted once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub filename: String,
    /// Duration of the canonical waveform in seconds
    pub duration: f64,
    /// Aggregate transcript
    pub transcript: String,
    pub wpm: f64,
    pub filler_ratio: f64,
    pub sentiment_score: f64,
    /// Path of the canonical working copy
    pub audio_path: String,
    pub processed_at: DateTime<Utc>,
}

/// Segment-level record for one selected segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub segment_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub transcript: String,
    pub audio_path: String,
    pub wpm: f64,
    pub filler_ratio: f64,
    pub sentiment_score: f64,
    #[serde(flatten)]
    pub metrics: QualityMetrics,
    pub is_ml_ready: bool,
    pub training_priority: f64,
}

/// Aggregates over one run, for caller-facing reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Candidates produced by the locator
    pub candidates: usize,
    /// Candidates dropped by the sentence gate
    pub rejected_by_gate: usize,
    /// Candidates scored with sentinel metrics
    pub assessment_failures: usize,
    /// Segments in the final corpus
    pub selected: usize,
    pub average_quality: f64,
    pub min_quality: f64,
    pub max_quality: f64,
    /// Selected segments with quality_score >= 0.7
    pub high_quality: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<AppliedThreshold>,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub file: FileRecord,
    /// Selected segments, ordered by quality score descending. This is not
    /// chronological order; sort by `segment_index` for that.
    pub segments: Vec<SegmentRecord>,
    pub strategy: LocatorStrategy,
    pub summary: RunSummary,
}

// ============================================================================
// Stored Types (query results)
// ============================================================================

/// File row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: i64,
    pub filename: String,
    pub duration: f64,
    pub transcript: String,
    pub wpm: f64,
    pub filler_ratio: f64,
    pub sentiment_score: f64,
    pub audio_path: String,
    pub created_at: String,
}

/// Segment row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSegment {
    pub id: i64,
    pub original_file_id: i64,
    #[serde(flatten)]
    pub record: SegmentRecord,
    pub created_at: String,
}

/// Quality statistics across all stored segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityStatistics {
    pub total_segments: usize,
    pub ml_ready_segments: usize,
    pub average_quality: f64,
    pub min_quality: f64,
    pub max_quality: f64,
    pub quality_std_dev: f64,
    pub average_volume: f64,
    pub average_volume_db: f64,
    pub average_noise_ratio: f64,
}

/// Processing statistics across files and segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatistics {
    pub total_files: usize,
    pub total_segments: usize,
    pub ml_ready_segments: usize,
    pub average_duration: f64,
    pub average_wpm: f64,
    pub average_quality_score: f64,
}

// ============================================================================
// Worker IPC Types
// ============================================================================

/// Worker command for IPC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WorkerCommand {
    /// Score one segment
    Assess {
        samples: Vec<f32>,
        sample_rate: u32,
        #[serde(default)]
        policy: Option<SelectionPolicy>,
    },
    /// Check transcript completeness
    Gate { text: String },
    /// Run the full pipeline on a file with a sidecar transcript
    Process {
        path: String,
        transcript_path: String,
        output_dir: String,
        #[serde(default)]
        target: Option<usize>,
    },
    /// Shutdown worker
    Shutdown,
}

/// Worker response for IPC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerResponse {
    /// Quality assessment result
    Quality {
        metrics: QualityMetrics,
        issues: Vec<QualityIssue>,
    },
    /// Sentence gate verdict
    Gate { complete: bool },
    /// Pipeline result
    Report(Box<RunReport>),
    /// Error
    Error { message: String },
    /// Acknowledgement
    Ok,
}
