use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use invoice_dedup_core::index::{MemoryIndex, SqliteIndex, VectorIndex};
use invoice_dedup_core::{FieldSelection, IndexConfig, RetryPolicy, StorageConfig};
use invoice_dedup_pipeline::PipelineConfig;
use invoice_dedup_remote::{EmbeddingServiceConfig, RecognizerServiceConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub ocr: OcrSection,
    #[serde(default)]
    pub embedding: EmbeddingSection,
    #[serde(default)]
    pub index: IndexSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSection {
    #[serde(flatten)]
    pub service: RecognizerServiceConfig,
    #[serde(flatten)]
    pub fields: FieldSelection,
    #[serde(default = "RetryPolicy::ocr_default")]
    pub retry: RetryPolicy,
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            service: RecognizerServiceConfig::default(),
            fields: FieldSelection::default(),
            retry: RetryPolicy::ocr_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSection {
    #[serde(flatten)]
    pub service: EmbeddingServiceConfig,
    #[serde(default = "RetryPolicy::embedding_default")]
    pub retry: RetryPolicy,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            service: EmbeddingServiceConfig::default(),
            retry: RetryPolicy::embedding_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSection {
    #[serde(default)]
    pub backend: IndexBackend,
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(flatten)]
    pub settings: IndexConfig,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            path: default_index_path(),
            settings: IndexConfig::default(),
        }
    }
}

impl IndexSection {
    pub fn open(&self) -> Result<Arc<dyn VectorIndex>> {
        match self.backend {
            IndexBackend::Memory => Ok(Arc::new(MemoryIndex::new())),
            IndexBackend::Sqlite => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                let index = SqliteIndex::open(&self.path)
                    .with_context(|| format!("failed to open index {}", self.path.display()))?;
                Ok(Arc::new(index))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub serialize_per_customer: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: None,
            serialize_per_customer: false,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline_config().validate()?;
        if self.pipeline.workers == Some(0) {
            bail!("pipeline.workers must be positive");
        }
        if self.pipeline.poll_interval_secs == 0 {
            bail!("pipeline.poll_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.storage.clone(), self.index.settings.clone());
        config.fields = self.ocr.fields.clone();
        config.ocr_retry = self.ocr.retry;
        config.embed_retry = self.embedding.retry;
        config.serialize_per_customer = self.pipeline.serialize_per_customer;
        if let Some(workers) = self.pipeline.workers {
            config.workers = workers;
        }
        config
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.pipeline.poll_interval_secs)
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("invoice-index.sqlite")
}

fn default_poll_interval_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_dedup_core::index::DistanceMetric;
    use invoice_dedup_remote::{EmbeddingProvider, RecognizerBackend};

    const MINIMAL: &str = r#"
[storage]
inbox = "/srv/invoices/inbox"
processed = "/srv/invoices/processed"
duplicates = "/srv/invoices/dups"
"#;

    #[test]
    fn minimal_config_takes_defaults() {
        let config = AppConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.ocr.service.backend, RecognizerBackend::Azure);
        assert_eq!(config.ocr.fields, FieldSelection::default());
        assert_eq!(config.ocr.retry, RetryPolicy::ocr_default());
        assert_eq!(config.embedding.retry, RetryPolicy::embedding_default());
        assert_eq!(config.index.backend, IndexBackend::Sqlite);
        assert_eq!(config.index.settings, IndexConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(10));

        let pipeline = config.pipeline_config();
        assert!(!pipeline.serialize_per_customer);
        assert!(pipeline.workers >= 1);
    }

    #[test]
    fn sections_flatten_into_service_settings() {
        let raw = format!(
            r#"{MINIMAL}
[ocr]
backend = "fixture"
fields = ["CustomerName", "InvoiceTotal"]
retry = {{ max_attempts = 5, min_wait_ms = 100, max_wait_ms = 2000 }}

[embedding]
provider = "hash"
seed = 7

[index]
backend = "memory"
name = "acme"
dimension = 64
metric = "l2"
similarity_bound = 0.9

[pipeline]
workers = 3
serialize_per_customer = true
"#
        );
        let config = AppConfig::parse(&raw).unwrap();
        assert_eq!(config.ocr.service.backend, RecognizerBackend::Fixture);
        assert_eq!(config.ocr.fields.fields, vec!["CustomerName", "InvoiceTotal"]);
        assert_eq!(config.ocr.retry.max_attempts, 5);
        assert_eq!(config.ocr.retry.base_ms, 1_000);
        assert_eq!(config.embedding.service.provider, EmbeddingProvider::Hash);
        assert_eq!(config.embedding.service.seed, 7);
        assert_eq!(config.index.settings.name, "acme");
        assert_eq!(config.index.settings.metric, DistanceMetric::L2);

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.workers, 3);
        assert!(pipeline.serialize_per_customer);
        assert!((pipeline.index.similarity_bound - 0.9).abs() < 1e-6);
    }

    #[test]
    fn rejects_shared_directories_and_zero_workers() {
        let shared = r#"
[storage]
inbox = "/srv/in"
processed = "/srv/in"
duplicates = "/srv/dups"
"#;
        assert!(AppConfig::parse(shared).is_err());

        let zero = format!("{MINIMAL}\n[pipeline]\nworkers = 0\n");
        assert!(AppConfig::parse(&zero).is_err());
    }

    #[test]
    fn sqlite_backend_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let section = IndexSection {
            path: dir.path().join("state/index.sqlite"),
            ..IndexSection::default()
        };
        let index = section.open().unwrap();
        assert!(!index.exists("invoices").unwrap());
        assert!(dir.path().join("state").is_dir());
    }

    #[test]
    fn shipped_example_parses() {
        let config = AppConfig::parse(include_str!("../../../invoice-dedup.example.toml")).unwrap();
        assert_eq!(config.ocr.retry, RetryPolicy::ocr_default());
        assert_eq!(config.embedding.retry, RetryPolicy::embedding_default());
        assert_eq!(config.index.settings.metric, DistanceMetric::Cosine);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
