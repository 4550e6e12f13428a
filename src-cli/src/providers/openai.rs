//! OpenAI-compatible transcription API
//!
//! Posts WAV audio to `{api_base}/audio/transcriptions` with
//! `response_format=verbose_json` so segment timestamps come back.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use voxcorpus_types::{TranscriptUtterance, TranscriptionResult};

use super::{ProviderError, SttProvider, TranscriptionOptions};
use crate::config::TranscriptionConfig;

/// verbose_json response
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

impl From<WhisperResponse> for TranscriptionResult {
    fn from(response: WhisperResponse) -> Self {
        let utterances = response
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|seg| TranscriptUtterance::new(seg.start, seg.end, seg.text.trim()))
            .collect();

        TranscriptionResult {
            text: response.text.trim().to_string(),
            utterances,
            language: response.language,
            duration: response.duration,
        }
    }
}

/// Map a non-success HTTP status to a provider error
fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        401 => ProviderError::auth_error("Invalid API key"),
        429 => ProviderError::rate_limited(),
        500..=599 => ProviderError::retryable("SERVER_ERROR", body),
        _ => ProviderError::api_error(format!("HTTP {}: {}", status, body)),
    }
}

pub struct OpenAiTranscriptionProvider {
    config: TranscriptionConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiTranscriptionProvider {
    pub fn new(config: TranscriptionConfig, api_key: Option<String>) -> Self {
        Self {
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Read the API key from the environment variable named in the config
    pub fn from_env(config: TranscriptionConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!("{} is not set", config.api_key_env);
        }
        Self::new(config, api_key)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl SttProvider for OpenAiTranscriptionProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(
        &self,
        audio_data: Vec<u8>,
        options: TranscriptionOptions,
    ) -> Result<TranscriptionResult, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::not_configured("OpenAI"))?;

        let file_part = Part::bytes(audio_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::new("FORM_ERROR", e.to_string()))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");

        if let Some(lang) = options.language.or_else(|| self.config.language.clone()) {
            form = form.text("language", lang);
        }
        if let Some(prompt) = options.prompt {
            form = form.text("prompt", prompt);
        }

        tracing::debug!("Transcription request: model={}", self.config.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .multipart(form)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::retryable("TIMEOUT", "Request timed out")
                } else if e.is_connect() {
                    ProviderError::network_error(e.to_string())
                } else {
                    ProviderError::api_error(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body));
        }

        let parsed: WhisperResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::api_error(format!("Failed to parse response: {}", e)))?;

        let result = TranscriptionResult::from(parsed);
        tracing::info!(
            "Transcription returned {} segments ({} chars)",
            result.utterances.len(),
            result.text.len()
        );
        Ok(result)
    }
}
