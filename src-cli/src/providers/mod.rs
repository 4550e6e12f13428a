//! Remote speech-to-text providers
//!
//! Providers are async; [`ProviderEngine`] adapts one to the synchronous
//! [`TranscriptionEngine`] seam the pipeline consumes.

pub mod openai;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use voxcorpus_audio::{samples_to_wav_bytes, Waveform};
use voxcorpus_ml::TranscriptionEngine;
use voxcorpus_types::TranscriptionResult;

pub use openai::OpenAiTranscriptionProvider;

/// Error type for provider operations
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_configured(provider: impl Into<String>) -> Self {
        Self::new(
            "NOT_CONFIGURED",
            format!("Provider {} is not configured", provider.into()),
        )
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::retryable("API_ERROR", message)
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::retryable("NETWORK_ERROR", message)
    }

    pub fn rate_limited() -> Self {
        Self::retryable("RATE_LIMITED", "Rate limit exceeded")
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::new("AUTH_ERROR", message)
    }
}

/// Options for a transcription request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionOptions {
    /// Language hint (ISO 639-1 code)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Prompt to guide transcription
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Speech-to-text provider
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &str;

    /// Transcribe WAV bytes
    async fn transcribe(
        &self,
        audio_data: Vec<u8>,
        options: TranscriptionOptions,
    ) -> Result<TranscriptionResult, ProviderError>;
}

/// Runs an async provider from blocking pipeline code.
///
/// Must be used off the runtime's worker threads (e.g. inside
/// `spawn_blocking`). The first response is cached so the coarse-text
/// fallback does not upload the audio twice.
pub struct ProviderEngine {
    provider: Arc<dyn SttProvider>,
    options: TranscriptionOptions,
    handle: Handle,
    cached: Mutex<Option<TranscriptionResult>>,
}

impl ProviderEngine {
    pub fn new(provider: Arc<dyn SttProvider>, options: TranscriptionOptions, handle: Handle) -> Self {
        Self {
            provider,
            options,
            handle,
            cached: Mutex::new(None),
        }
    }

    fn fetch(&self, waveform: &Waveform) -> anyhow::Result<TranscriptionResult> {
        if let Some(result) = self.cached.lock().clone() {
            return Ok(result);
        }

        let audio = samples_to_wav_bytes(waveform.samples(), waveform.sample_rate())?;
        tracing::debug!(
            "Uploading {:.1}s of audio ({} bytes) to {}",
            waveform.duration(),
            audio.len(),
            self.provider.name()
        );

        let result = self
            .handle
            .block_on(self.provider.transcribe(audio, self.options.clone()))?;
        *self.cached.lock() = Some(result.clone());
        Ok(result)
    }
}

impl TranscriptionEngine for ProviderEngine {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn transcribe(&self, waveform: &Waveform) -> anyhow::Result<String> {
        Ok(self.fetch(waveform)?.text)
    }

    fn transcribe_with_timestamps(&self, waveform: &Waveform) -> anyhow::Result<TranscriptionResult> {
        self.fetch(waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voxcorpus_types::TranscriptUtterance;

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SttProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn transcribe(
            &self,
            audio_data: Vec<u8>,
            _options: TranscriptionOptions,
        ) -> Result<TranscriptionResult, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::rate_limited());
            }
            assert_eq!(&audio_data[0..4], b"RIFF");
            Ok(TranscriptionResult {
                text: "Hello there.".to_string(),
                utterances: vec![TranscriptUtterance::new(0.0, 1.0, "Hello there.")],
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::auth_error("Invalid API key");
        assert_eq!(err.to_string(), "[AUTH_ERROR] Invalid API key");
        assert!(!err.retryable);
        assert!(ProviderError::network_error("refused").retryable);
    }

    #[test]
    fn test_engine_caches_provider_response() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let engine = ProviderEngine::new(
            provider.clone(),
            TranscriptionOptions::default(),
            runtime.handle().clone(),
        );

        let waveform = Waveform::new(vec![0.1; 16000], 16000);
        let result = engine.transcribe_with_timestamps(&waveform).unwrap();
        assert!(result.has_timestamps());
        assert_eq!(engine.transcribe(&waveform).unwrap(), "Hello there.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.name(), "counting");
    }

    #[test]
    fn test_engine_surfaces_provider_error() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let engine = ProviderEngine::new(
            Arc::new(CountingProvider {
                calls: AtomicUsize::new(0),
                fail: true,
            }),
            TranscriptionOptions::default(),
            runtime.handle().clone(),
        );

        let err = engine
            .transcribe(&Waveform::new(vec![0.0; 1600], 16000))
            .unwrap_err();
        assert!(err.to_string().contains("RATE_LIMITED"));
    }
}
