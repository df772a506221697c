use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{error, info, info_span, warn};

use invoice_dedup_core::index::VectorIndex;
use invoice_dedup_core::{
    DedupError, Disposition, DocumentRecognizer, Embedder, InvoiceRecord, Result, WorkItem,
};

use crate::config::PipelineConfig;
use crate::dedup::{DedupEngine, DedupOutcome};
use crate::stages::{EmbedStage, OcrStage};

/// What happened to one inbox file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Final record, present when the pipeline reached a disposition.
    pub record: Option<InvoiceRecord>,
    pub result: std::result::Result<DedupOutcome, DedupError>,
}

impl FileOutcome {
    pub fn disposition(&self) -> Option<Disposition> {
        self.result.as_ref().ok().map(|outcome| outcome.disposition)
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn new_count(&self) -> usize {
        self.count(Disposition::New)
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(Disposition::Duplicate)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    fn count(&self, disposition: Disposition) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.disposition() == Some(disposition))
            .count()
    }
}

/// Runs OCR, embedding and dedup for every work item, one independent
/// chain per file, spread across a fixed worker pool.
pub struct PipelineCoordinator {
    ocr: OcrStage,
    embed: EmbedStage,
    dedup: DedupEngine,
    pool: ThreadPool,
}

impl PipelineCoordinator {
    pub fn new(
        config: &PipelineConfig,
        recognizer: Arc<dyn DocumentRecognizer>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        config.validate()?;
        let ocr = OcrStage::new(recognizer, config.fields.clone(), config.ocr_retry);
        let embed = EmbedStage::new(embedder, config.embed_retry, config.index.dimension);
        let mut dedup = DedupEngine::new(
            index,
            config.index.schema(),
            config.index.similarity_bound,
            &config.storage.processed,
            &config.storage.duplicates,
        );
        if config.serialize_per_customer {
            dedup = dedup.with_customer_locks();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("invoice-worker-{i}"))
            .build()
            .map_err(|err| DedupError::Config(format!("failed to start worker pool: {err}")))?;
        Ok(Self {
            ocr,
            embed,
            dedup,
            pool,
        })
    }

    /// Runs the whole chain for a single file. Never panics on a stage
    /// failure; the error is returned in the outcome and the file is left
    /// where the failing stage found it.
    pub fn process(&self, item: &WorkItem) -> FileOutcome {
        let span = info_span!("invoice", file = %item.path().display());
        let _enter = span.enter();
        let staged = self
            .ocr
            .run(item)
            .and_then(|record| self.embed.run(record))
            .and_then(|record| {
                let outcome = self.dedup.dedup(&record)?;
                Ok((record.finalize(outcome.disposition), outcome))
            });
        match staged {
            Ok((record, outcome)) => FileOutcome {
                path: item.path().to_path_buf(),
                record: Some(record),
                result: Ok(outcome),
            },
            Err(err) => {
                if !matches!(err, DedupError::Inconsistent { .. }) {
                    error!(error = %err, "invoice pipeline aborted; file left in inbox");
                }
                FileOutcome {
                    path: item.path().to_path_buf(),
                    record: None,
                    result: Err(err),
                }
            }
        }
    }

    /// Fans the batch out over the worker pool. Only an index that cannot
    /// be prepared fails the whole batch; per-file errors land in the
    /// report.
    pub fn run_batch(&self, items: &[WorkItem]) -> Result<BatchReport> {
        if items.is_empty() {
            return Ok(BatchReport::default());
        }
        self.dedup.ensure_index()?;
        info!(files = items.len(), "processing inbox batch");
        let outcomes: Vec<FileOutcome> = self
            .pool
            .install(|| items.par_iter().map(|item| self.process(item)).collect());
        let report = BatchReport { outcomes };
        if report.failed_count() > 0 {
            warn!(
                failed = report.failed_count(),
                files = report.len(),
                "some invoices were not processed"
            );
        }
        info!(
            new = report.new_count(),
            duplicate = report.duplicate_count(),
            failed = report.failed_count(),
            "inbox batch finished"
        );
        Ok(report)
    }
}
