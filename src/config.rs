//! ALFA Notes Vault - Configuration
//!
//! JSON file plus a few environment overrides. Every field has a default,
//! so an empty `{}` is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::retry::RetryPolicy;

/// Directory name under the platform data dir
const APP_DIR: &str = "alfa_notes_vault";
const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "notes.db";

pub const ENV_DATA_DIR: &str = "ALFA_NOTES_DATA_DIR";
pub const ENV_EMBEDDING_ENDPOINT: &str = "ALFA_NOTES_EMBEDDING_ENDPOINT";
pub const ENV_EMBEDDING_MODEL: &str = "ALFA_NOTES_EMBEDDING_MODEL";

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Embedding service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible `/embeddings` URL
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            timeout_secs: 30,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the notes database lives
    pub data_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub retry: RetryPolicy,
    /// How long the biometric prompt may stay open
    pub biometric_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            embedding: EmbeddingConfig::default(),
            retry: RetryPolicy::default(),
            biometric_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `<data_dir>/config.json` when it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> VaultResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let implicit = env_data_dir().unwrap_or_else(default_data_dir).join(CONFIG_FILE);
                if implicit.exists() {
                    Self::from_file(&implicit)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        log::debug!("Using data dir {}", config.data_dir.display());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> VaultResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> VaultResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| VaultError::SerializationError(format!("config: {}", e)))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(endpoint) = lookup(ENV_EMBEDDING_ENDPOINT) {
            self.embedding.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_EMBEDDING_MODEL) {
            self.embedding.model = model;
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn biometric_timeout(&self) -> Duration {
        Duration::from_secs(self.biometric_timeout_secs)
    }
}

fn env_data_dir() -> Option<PathBuf> {
    std::env::var(ENV_DATA_DIR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
