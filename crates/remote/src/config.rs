use std::env;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use invoice_dedup_core::{
    DedupError, DocumentRecognizer, Embedder, HashEmbedder, HashEmbedderConfig, Result,
};

use crate::embedder::HttpEmbedder;
use crate::recognizer::{AzureRecognizer, FixtureRecognizer};

pub const OCR_KEY_ENV: &str = "INVOICE_OCR_KEY";
pub const EMBED_KEY_ENV: &str = "INVOICE_EMBED_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerBackend {
    #[default]
    Azure,
    Fixture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerServiceConfig {
    #[serde(default)]
    pub backend: RecognizerBackend,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_ocr_model")]
    pub model: String,
    #[serde(default = "default_ocr_api_version")]
    pub api_version: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: usize,
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RecognizerServiceConfig {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::default(),
            endpoint: String::new(),
            key: None,
            model: default_ocr_model(),
            api_version: default_ocr_api_version(),
            locale: default_locale(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

impl RecognizerServiceConfig {
    pub fn build(&self) -> Result<Arc<dyn DocumentRecognizer>> {
        match self.backend {
            RecognizerBackend::Fixture => Ok(Arc::new(FixtureRecognizer::new())),
            RecognizerBackend::Azure => {
                let key = resolve_key(self.key.as_deref(), OCR_KEY_ENV)?;
                Ok(Arc::new(AzureRecognizer::new(
                    &self.endpoint,
                    key,
                    self.model.clone(),
                    self.api_version.clone(),
                    self.locale.clone(),
                    Duration::from_millis(self.poll_interval_ms),
                    self.max_polls,
                    Duration::from_secs(self.timeout_secs),
                )?))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Azure,
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_embed_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default = "default_embed_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            endpoint: default_embed_endpoint(),
            key: None,
            model: default_embed_model(),
            deployment: None,
            api_version: default_embed_api_version(),
            dimensions: None,
            timeout_secs: default_embed_timeout_secs(),
            seed: default_seed(),
        }
    }
}

impl EmbeddingServiceConfig {
    /// `index_dimension` sizes the offline embedder so its vectors fit the
    /// configured index.
    pub fn build(&self, index_dimension: usize) -> Result<Arc<dyn Embedder>> {
        let timeout = Duration::from_secs(self.timeout_secs);
        match self.provider {
            EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(HashEmbedderConfig {
                dimensions: index_dimension,
                seed: self.seed,
            }))),
            EmbeddingProvider::OpenAi => {
                let key = resolve_key(self.key.as_deref(), EMBED_KEY_ENV)?;
                Ok(Arc::new(HttpEmbedder::openai(
                    &self.endpoint,
                    key,
                    self.model.clone(),
                    self.dimensions,
                    timeout,
                )?))
            }
            EmbeddingProvider::Azure => {
                let key = resolve_key(self.key.as_deref(), EMBED_KEY_ENV)?;
                let deployment = self.deployment.as_deref().unwrap_or(&self.model);
                Ok(Arc::new(HttpEmbedder::azure(
                    &self.endpoint,
                    key,
                    deployment,
                    &self.api_version,
                    self.dimensions,
                    timeout,
                )?))
            }
        }
    }
}

fn resolve_key(configured: Option<&str>, var: &str) -> Result<String> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    env::var(var).map_err(|_| DedupError::Config(format!("{var} is not set")))
}

fn default_ocr_model() -> String {
    "prebuilt-invoice".to_string()
}

fn default_ocr_api_version() -> String {
    "2023-07-31".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_polls() -> usize {
    120
}

fn default_ocr_timeout_secs() -> u64 {
    120
}

fn default_embed_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embed_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embed_api_version() -> String {
    "2023-05-15".to_string()
}

fn default_embed_timeout_secs() -> u64 {
    60
}

fn default_seed() -> u64 {
    1337
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_backends_need_no_credentials() {
        let recognizer = RecognizerServiceConfig {
            backend: RecognizerBackend::Fixture,
            ..RecognizerServiceConfig::default()
        }
        .build()
        .unwrap();
        assert_eq!(recognizer.name(), "fixture");

        let embedder = EmbeddingServiceConfig {
            provider: EmbeddingProvider::Hash,
            ..EmbeddingServiceConfig::default()
        }
        .build(12)
        .unwrap();
        assert_eq!(embedder.embed("Acme").unwrap().len(), 12);
    }

    #[test]
    fn configured_key_wins_over_environment() {
        assert_eq!(
            resolve_key(Some("from-file"), "INVOICE_DEDUP_TEST_UNSET").unwrap(),
            "from-file"
        );
        assert!(resolve_key(Some("  "), "INVOICE_DEDUP_TEST_UNSET").is_err());
    }
}
