//! Transcription sources that need no model at runtime

use crate::traits::TranscriptionEngine;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use voxcorpus_audio::Waveform;
use voxcorpus_types::{TranscriptUtterance, TranscriptionResult};

/// Whisper-style transcript document
#[derive(Debug, Deserialize)]
struct TranscriptDocument {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<DocumentSegment>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DocumentSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

impl From<TranscriptDocument> for TranscriptionResult {
    fn from(doc: TranscriptDocument) -> Self {
        let utterances: Vec<TranscriptUtterance> = doc
            .segments
            .into_iter()
            .map(|s| TranscriptUtterance::new(s.start, s.end, s.text))
            .collect();

        let text = if doc.text.trim().is_empty() {
            utterances
                .iter()
                .map(|u| u.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            doc.text.trim().to_string()
        };

        TranscriptionResult {
            text,
            utterances,
            language: doc.language,
            duration: doc.duration,
        }
    }
}

/// Parse a Whisper-style JSON transcript
pub fn parse_transcript_json(json: &str) -> Result<TranscriptionResult> {
    let doc: TranscriptDocument =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;
    Ok(doc.into())
}

/// Transcript stored next to the audio.
///
/// `.json` files are read as Whisper-style documents
/// (`{"text": ..., "segments": [{"start", "end", "text"}]}`); any other file
/// is taken as plain text without timing.
#[derive(Debug, Clone)]
pub struct SidecarTranscript {
    path: PathBuf,
    result: TranscriptionResult,
}

impl SidecarTranscript {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript {:?}", path))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let result = if is_json {
            parse_transcript_json(&content)
                .with_context(|| format!("Invalid transcript {:?}", path))?
        } else {
            TranscriptionResult::text_only(content.trim())
        };

        tracing::info!(
            "Loaded transcript {:?}: {} utterances, {} chars",
            path,
            result.utterances.len(),
            result.text.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            result,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptionEngine for SidecarTranscript {
    fn name(&self) -> &str {
        "sidecar"
    }

    fn transcribe(&self, _waveform: &Waveform) -> Result<String> {
        Ok(self.result.text.clone())
    }

    fn transcribe_with_timestamps(&self, _waveform: &Waveform) -> Result<TranscriptionResult> {
        Ok(self.result.clone())
    }
}

/// Already-available transcription result, e.g. from a remote provider
#[derive(Debug, Clone)]
pub struct FixedTranscript {
    name: String,
    result: TranscriptionResult,
}

impl FixedTranscript {
    pub fn new(name: impl Into<String>, result: TranscriptionResult) -> Self {
        Self {
            name: name.into(),
            result,
        }
    }
}

impl TranscriptionEngine for FixedTranscript {
    fn name(&self) -> &str {
        &self.name
    }

    fn transcribe(&self, _waveform: &Waveform) -> Result<String> {
        Ok(self.result.text.clone())
    }

    fn transcribe_with_timestamps(&self, _waveform: &Waveform) -> Result<TranscriptionResult> {
        Ok(self.result.clone())
    }
}
