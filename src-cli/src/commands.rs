//! Command implementations
//!
//! Each command returns serializable data; presentation lives in the binary.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use voxcorpus_audio::{load_audio_file, SignalNormalizer};
use voxcorpus_ml::{CorpusPipeline, QualityAssessor, SidecarTranscript, TranscriptionEngine};
use voxcorpus_types::{QualityIssue, QualityMetrics, RunReport, SegmentRecord};

use crate::config::{AppConfig, ProviderKind};
use crate::providers::{OpenAiTranscriptionProvider, ProviderEngine, TranscriptionOptions};
use crate::store::CorpusStore;

/// Options for `process`
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub input: PathBuf,
    pub transcript: Option<PathBuf>,
    pub provider: Option<ProviderKind>,
    pub target: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub store: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub run_id: String,
    pub output_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<i64>,
    pub report: RunReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessOutcome {
    pub file: String,
    pub duration: f64,
    pub metrics: QualityMetrics,
    pub issues: Vec<QualityIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

pub fn pipeline(config: &AppConfig) -> CorpusPipeline {
    CorpusPipeline::new(
        config.policy,
        config.segmentation,
        config.normalizer.into(),
        config.fillers(),
    )
}

/// `<audio>.json`, then `<audio>.txt`, next to the input
pub fn find_sidecar(input: &Path) -> Option<PathBuf> {
    ["json", "txt"]
        .iter()
        .map(|ext| input.with_extension(ext))
        .find(|p| p.is_file())
}

fn run_output_dir(config: &AppConfig, explicit: Option<&Path>, run_id: &str) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => config.output_dir.join(run_id),
    }
}

/// Normalize, segment, score and select one recording; optionally persist it
pub async fn process(config: &AppConfig, request: ProcessRequest) -> Result<ProcessOutcome> {
    if !request.input.is_file() {
        bail!("Input file not found: {:?}", request.input);
    }

    let mut config = config.clone();
    if let Some(target) = request.target {
        config.policy.target_corpus_size = target;
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let output_dir = run_output_dir(&config, request.output_dir.as_deref(), &run_id);
    let provider = request.provider.unwrap_or(config.transcription.provider);

    let engine: Box<dyn TranscriptionEngine> = match provider {
        ProviderKind::Sidecar => {
            let path = match request.transcript.clone() {
                Some(path) => path,
                None => find_sidecar(&request.input).with_context(|| {
                    format!("No transcript given and no sidecar found for {:?}", request.input)
                })?,
            };
            Box::new(SidecarTranscript::open(&path)?)
        }
        ProviderKind::OpenAi => {
            let provider = OpenAiTranscriptionProvider::from_env(config.transcription.clone());
            if !provider.is_configured() {
                bail!(
                    "OpenAI provider needs an API key in ${}",
                    config.transcription.api_key_env
                );
            }
            let options = TranscriptionOptions {
                language: config.transcription.language.clone(),
                prompt: None,
            };
            Box::new(ProviderEngine::new(
                Arc::new(provider),
                options,
                tokio::runtime::Handle::current(),
            ))
        }
    };

    tracing::info!(
        "Run {}: {:?} via {} into {:?}",
        run_id,
        request.input,
        engine.name(),
        output_dir
    );

    let pipeline = pipeline(&config);
    let input = request.input.clone();
    let dir = output_dir.clone();
    let report = tokio::task::spawn_blocking(move || {
        pipeline.process_file(&input, engine.as_ref(), &dir)
    })
    .await
    .context("Processing task panicked")??;

    let file_id = if request.store {
        let store = CorpusStore::open(&config.database_path)?;
        let (file_id, _) = store.save_run(&report)?;
        Some(file_id)
    } else {
        None
    };

    Ok(ProcessOutcome {
        run_id,
        output_dir,
        file_id,
        report,
    })
}

/// Energy segmentation of a recording without a transcript
pub fn acoustic(
    config: &AppConfig,
    input: &Path,
    output_dir: Option<&Path>,
) -> Result<Vec<SegmentRecord>> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let output_dir = run_output_dir(config, output_dir, &run_id);
    Ok(pipeline(config).acoustic_segments(input, &output_dir)?)
}

/// Score a whole recording as a single segment
pub fn assess(config: &AppConfig, input: &Path) -> Result<AssessOutcome> {
    let decoded = load_audio_file(input)?;
    let waveform = SignalNormalizer::new(config.normalizer.into()).normalize(decoded)?;
    let assessor = QualityAssessor::new(config.policy);

    let (metrics, failure) = match assessor.assess(waveform.samples(), waveform.sample_rate()) {
        Ok(metrics) => (metrics, None),
        Err(e) => (QualityMetrics::sentinel(), Some(e.to_string())),
    };

    Ok(AssessOutcome {
        file: input.display().to_string(),
        duration: waveform.duration(),
        issues: config.policy.issues(&metrics),
        metrics,
        failure,
    })
}
