//! Application configuration
//!
//! Stored as camelCase JSON. Every field has a default, so a partial file
//! (or none at all) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use voxcorpus_audio::NormalizerConfig;
use voxcorpus_ml::{FillerLexicon, SegmentationConfig, DEFAULT_FILLER_LEXICON};
use voxcorpus_types::SelectionPolicy;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "VOXCORPUS_CONFIG";

/// Get data directory path
pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("voxcorpus"))
}

/// Which transcription source `process` uses by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Transcript file next to the audio
    #[default]
    Sidecar,
    /// OpenAI-compatible `/audio/transcriptions` endpoint
    OpenAi,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sidecar" => Ok(Self::Sidecar),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown provider '{}' (expected sidecar or openai)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_base: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub language: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Sidecar,
            model: "whisper-1".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            language: None,
            timeout_secs: 120,
        }
    }
}

/// Normalizer section; mirrors [`NormalizerConfig`] with serde support
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizerSettings {
    pub target_sample_rate: u32,
    pub headroom: f32,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        let config = NormalizerConfig::default();
        Self {
            target_sample_rate: config.target_sample_rate,
            headroom: config.headroom,
        }
    }
}

impl From<NormalizerSettings> for NormalizerConfig {
    fn from(settings: NormalizerSettings) -> Self {
        Self {
            target_sample_rate: settings.target_sample_rate,
            headroom: settings.headroom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub policy: SelectionPolicy,
    pub segmentation: SegmentationConfig,
    pub normalizer: NormalizerSettings,
    pub filler_lexicon: Vec<String>,
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub transcription: TranscriptionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = get_data_dir().unwrap_or_else(|| PathBuf::from(".voxcorpus"));
        Self {
            policy: SelectionPolicy::default(),
            segmentation: SegmentationConfig::default(),
            normalizer: NormalizerSettings::default(),
            filler_lexicon: DEFAULT_FILLER_LEXICON.iter().map(|s| s.to_string()).collect(),
            database_path: data_dir.join("corpus.db"),
            output_dir: data_dir.join("processed"),
            log_dir: data_dir.join("logs"),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Config path: explicit flag, then `VOXCORPUS_CONFIG`, then the data dir
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        get_data_dir().map(|p| p.join("config.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("config.json not found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded settings from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn fillers(&self) -> FillerLexicon {
        FillerLexicon::new(&self.filler_lexicon)
    }
}
