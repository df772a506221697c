use serde::{Deserialize, Serialize};

use invoice_dedup_core::{
    FieldSelection, IndexConfig, Result, RetryPolicy, StorageConfig,
};

/// Everything a pipeline run needs, resolved once and passed down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub fields: FieldSelection,
    pub ocr_retry: RetryPolicy,
    pub embed_retry: RetryPolicy,
    pub workers: usize,
    pub serialize_per_customer: bool,
}

impl PipelineConfig {
    pub fn new(storage: StorageConfig, index: IndexConfig) -> Self {
        Self {
            storage,
            index,
            fields: FieldSelection::default(),
            ocr_retry: RetryPolicy::ocr_default(),
            embed_retry: RetryPolicy::embedding_default(),
            workers: default_workers(),
            serialize_per_customer: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.index.validate()?;
        self.ocr_retry.validate("ocr.retry")?;
        self.embed_retry.validate("embedding.retry")?;
        Ok(())
    }
}

pub(crate) fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
