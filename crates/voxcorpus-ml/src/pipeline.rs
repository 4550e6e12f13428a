//! End-to-end corpus building for one recording
//!
//! normalize → locate → gate → assess → select → write artifacts

use crate::error::PipelineError;
use crate::linguistics::{training_priority, FeatureExtractor, FillerLexicon};
use crate::locator::{
    EnergyLocator, SegmentLocator, SegmentationConfig, SentenceSplitLocator, TimestampLocator,
};
use crate::quality::QualityAssessor;
use crate::selector::{CorpusSelector, SelectionOutcome};
use crate::sentence_gate::SentenceGate;
use crate::traits::TranscriptionEngine;
use chrono::Utc;
use std::path::{Path, PathBuf};
use voxcorpus_audio::{write_wav, NormalizerConfig, SignalNormalizer, Waveform};
use voxcorpus_types::{
    CandidateSegment, FileRecord, LocatorStrategy, RunReport, RunSummary, ScoredSegment,
    SegmentRecord, SelectionPolicy,
};

/// Quality score from which a selected segment counts as high quality
pub const HIGH_QUALITY_SCORE: f64 = 0.7;

/// Selection result for an in-memory waveform, before anything is written
#[derive(Debug, Clone)]
pub struct CorpusRun {
    pub strategy: LocatorStrategy,
    /// Aggregate transcript of the recording
    pub transcript: String,
    /// Candidates produced by the locator
    pub candidates: usize,
    pub rejected_by_gate: usize,
    pub assessment_failures: usize,
    pub outcome: SelectionOutcome,
}

impl CorpusRun {
    pub fn summary(&self) -> RunSummary {
        let scores: Vec<f64> = self
            .outcome
            .selected
            .iter()
            .map(ScoredSegment::quality_score)
            .collect();

        let (average_quality, min_quality, max_quality) = if scores.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                scores.iter().sum::<f64>() / scores.len() as f64,
                scores.iter().copied().fold(f64::INFINITY, f64::min),
                scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        RunSummary {
            candidates: self.candidates,
            rejected_by_gate: self.rejected_by_gate,
            assessment_failures: self.assessment_failures,
            selected: scores.len(),
            average_quality,
            min_quality,
            max_quality,
            high_quality: scores.iter().filter(|&&q| q >= HIGH_QUALITY_SCORE).count(),
            threshold: Some(self.outcome.threshold),
        }
    }
}

/// Builds a quality-ranked corpus from recordings
#[derive(Debug, Default)]
pub struct CorpusPipeline {
    normalizer: SignalNormalizer,
    segmentation: SegmentationConfig,
    assessor: QualityAssessor,
    selector: CorpusSelector,
    gate: SentenceGate,
    features: FeatureExtractor,
}

impl CorpusPipeline {
    pub fn new(
        policy: SelectionPolicy,
        segmentation: SegmentationConfig,
        normalizer: NormalizerConfig,
        fillers: FillerLexicon,
    ) -> Self {
        Self {
            normalizer: SignalNormalizer::new(normalizer),
            segmentation,
            assessor: QualityAssessor::new(policy),
            selector: CorpusSelector::new(policy),
            gate: SentenceGate::new(fillers.clone()),
            features: FeatureExtractor::new(fillers),
        }
    }

    pub fn policy(&self) -> &SelectionPolicy {
        self.assessor.policy()
    }

    pub fn features(&self) -> &FeatureExtractor {
        &self.features
    }

    /// Locate, gate, assess and select on a canonical waveform
    pub fn run(
        &self,
        waveform: &Waveform,
        engine: &dyn TranscriptionEngine,
        file: &str,
    ) -> Result<CorpusRun, PipelineError> {
        let (strategy, transcript, candidates) = self.locate(waveform, engine, file)?;
        let located = candidates.len();
        tracing::info!("{}: {} candidates via {}", file, located, strategy);

        let candidates: Vec<CandidateSegment> = if strategy == LocatorStrategy::Energy {
            candidates
        } else {
            candidates
                .into_iter()
                .filter(|c| {
                    let complete = self.gate.is_complete(&c.transcript);
                    if !complete {
                        tracing::debug!("Segment {} rejected by sentence gate", c.index);
                    }
                    complete
                })
                .collect()
        };
        let rejected_by_gate = located - candidates.len();

        let pool: Vec<ScoredSegment> = candidates
            .into_iter()
            .map(|c| self.assessor.score(c))
            .collect();
        let assessment_failures = pool.iter().filter(|s| s.assessment_failed).count();

        let outcome = self.selector.select(pool);
        tracing::info!(
            "{}: selected {} of {} scored segments (threshold {:.3}{})",
            file,
            outcome.selected.len(),
            outcome.pool_size,
            outcome.threshold.value(),
            if outcome.threshold.is_relaxed() { ", relaxed" } else { "" }
        );

        Ok(CorpusRun {
            strategy,
            transcript,
            candidates: located,
            rejected_by_gate,
            assessment_failures,
            outcome,
        })
    }

    /// Timestamp strategy when the engine yields usable utterances,
    /// otherwise sentence splitting of the coarse transcript
    fn locate(
        &self,
        waveform: &Waveform,
        engine: &dyn TranscriptionEngine,
        file: &str,
    ) -> Result<(LocatorStrategy, String, Vec<CandidateSegment>), PipelineError> {
        match engine.transcribe_with_timestamps(waveform) {
            Ok(result) if result.has_timestamps() => {
                let locator = TimestampLocator::new(result.utterances, self.segmentation);
                let candidates = locator.locate(waveform);
                if !candidates.is_empty() {
                    return Ok((locator.strategy(), result.text, candidates));
                }
                tracing::warn!(
                    "{}: no usable utterances from {}, falling back to sentence split",
                    file,
                    engine.name()
                );
            }
            Ok(_) => {
                tracing::info!("{}: {} returned no timestamps", file, engine.name());
            }
            Err(e) => {
                tracing::warn!(
                    "{}: timestamped transcription via {} failed, falling back: {:#}",
                    file,
                    engine.name(),
                    e
                );
            }
        }

        let text = engine
            .transcribe(waveform)
            .map_err(|e| PipelineError::Transcription {
                file: file.to_string(),
                message: format!("{:#}", e),
            })?;

        let locator = SentenceSplitLocator::new(text.clone(), self.segmentation);
        let candidates = locator.locate(waveform);
        Ok((locator.strategy(), text, candidates))
    }

    /// Normalize `input`, build the corpus and write the canonical copy plus
    /// one WAV per selected segment into `output_dir`
    pub fn process_file(
        &self,
        input: &Path,
        engine: &dyn TranscriptionEngine,
        output_dir: &Path,
    ) -> Result<RunReport, PipelineError> {
        let (filename, stem) = file_names(input);
        tracing::info!("Processing {} with {}", filename, engine.name());

        let canonical_path = output_dir.join(format!("{}_processed.wav", stem));
        let waveform = self
            .normalizer
            .normalize_file(input, &canonical_path)
            .map_err(|e| PipelineError::from_audio(&filename, e))?;

        let run = self.run(&waveform, engine, &filename)?;
        let summary = run.summary();

        let mut segments = Vec::with_capacity(run.outcome.selected.len());
        for scored in &run.outcome.selected {
            let path = segment_path(output_dir, &stem, scored.segment.index);
            self.write_segment(&filename, &path, &scored.segment)?;
            segments.push(self.segment_record(scored, &path));
        }

        let duration = waveform.duration();
        let file = FileRecord {
            filename,
            duration,
            wpm: self.features.wpm(&run.transcript, duration),
            filler_ratio: self.features.filler_ratio(&run.transcript),
            sentiment_score: self.features.sentiment(&run.transcript),
            transcript: run.transcript,
            audio_path: canonical_path.display().to_string(),
            processed_at: Utc::now(),
        };

        tracing::info!(
            "{}: wrote {} segments, average quality {:.3}",
            file.filename,
            summary.selected,
            summary.average_quality
        );

        Ok(RunReport {
            file,
            segments,
            strategy: run.strategy,
            summary,
        })
    }

    /// Energy segmentation without a transcript. Keeps and writes every
    /// acceptable segment, in locator order.
    pub fn acoustic_segments(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<Vec<SegmentRecord>, PipelineError> {
        let (filename, stem) = file_names(input);
        let canonical_path = output_dir.join(format!("{}_processed.wav", stem));
        let waveform = self
            .normalizer
            .normalize_file(input, &canonical_path)
            .map_err(|e| PipelineError::from_audio(&filename, e))?;

        let candidates = EnergyLocator::new(self.segmentation).locate(&waveform);
        tracing::info!("{}: {} energy segments", filename, candidates.len());

        let mut records = Vec::new();
        for candidate in candidates {
            let scored = self.assessor.score(candidate);
            if !scored.metrics.is_acceptable {
                continue;
            }
            let path = segment_path(output_dir, &stem, scored.segment.index);
            self.write_segment(&filename, &path, &scored.segment)?;
            records.push(SegmentRecord {
                training_priority: scored.metrics.quality_score,
                ..self.segment_record(&scored, &path)
            });
        }

        Ok(records)
    }

    fn write_segment(
        &self,
        file: &str,
        path: &Path,
        segment: &CandidateSegment,
    ) -> Result<(), PipelineError> {
        write_wav(path, &segment.samples, segment.sample_rate).map_err(|source| {
            PipelineError::Artifact {
                file: file.to_string(),
                path: path.display().to_string(),
                source,
            }
        })
    }

    fn segment_record(&self, scored: &ScoredSegment, path: &Path) -> SegmentRecord {
        let segment = &scored.segment;
        let wpm = self.features.wpm(&segment.transcript, segment.duration);
        let filler_ratio = self.features.filler_ratio(&segment.transcript);

        SegmentRecord {
            segment_index: segment.index,
            start_time: segment.start_time,
            end_time: segment.end_time,
            duration: segment.duration,
            transcript: segment.transcript.clone(),
            audio_path: path.display().to_string(),
            wpm,
            filler_ratio,
            sentiment_score: self.features.sentiment(&segment.transcript),
            metrics: scored.metrics,
            is_ml_ready: true,
            training_priority: training_priority(
                scored.metrics.quality_score,
                wpm,
                filler_ratio,
                &segment.transcript,
            ),
        }
    }
}

fn file_names(input: &Path) -> (String, String) {
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    (filename, stem)
}

fn segment_path(output_dir: &Path, stem: &str, index: usize) -> PathBuf {
    output_dir.join(format!("{}_segment_{:03}.wav", stem, index))
}
