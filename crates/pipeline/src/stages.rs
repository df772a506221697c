use std::sync::Arc;

use tracing::{debug, info};

use invoice_dedup_core::{
    call_with_retry, project_document, DedupError, DocumentRecognizer, Embedder, FieldSelection,
    InvoiceRecord, Result, RetryPolicy, WorkItem,
};

/// File to flattened invoice text plus customer name.
#[derive(Clone)]
pub struct OcrStage {
    recognizer: Arc<dyn DocumentRecognizer>,
    fields: FieldSelection,
    retry: RetryPolicy,
}

impl OcrStage {
    pub fn new(
        recognizer: Arc<dyn DocumentRecognizer>,
        fields: FieldSelection,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            recognizer,
            fields,
            retry,
        }
    }

    pub fn run(&self, item: &WorkItem) -> Result<InvoiceRecord> {
        let doc = call_with_retry(&self.retry, "ocr", || {
            self.recognizer.recognize(item.path())
        })?;
        let projection = project_document(&doc, &self.fields);
        if projection.text.is_empty() {
            return Err(DedupError::MissingField("ocr text"));
        }
        info!(
            customer = %projection.customer_name,
            chars = projection.text.len(),
            backend = self.recognizer.name(),
            "invoice recognized"
        );
        debug!(text = %projection.text, "ocr projection");
        Ok(InvoiceRecord::new(
            item.path(),
            projection.customer_name,
            projection.text,
        ))
    }
}

/// Adds the embedding vector to a recognized invoice.
#[derive(Clone)]
pub struct EmbedStage {
    embedder: Arc<dyn Embedder>,
    retry: RetryPolicy,
    dimension: usize,
}

impl EmbedStage {
    pub fn new(embedder: Arc<dyn Embedder>, retry: RetryPolicy, dimension: usize) -> Self {
        Self {
            embedder,
            retry,
            dimension,
        }
    }

    pub fn run(&self, record: InvoiceRecord) -> Result<InvoiceRecord> {
        if record.ocr_text.trim().is_empty() {
            return Err(DedupError::MissingField("ocr text"));
        }
        let vector = call_with_retry(&self.retry, "embedding", || {
            self.embedder.embed(&record.ocr_text)
        })?;
        if vector.len() != self.dimension {
            return Err(DedupError::Fatal(format!(
                "{} returned {} dimensions, index expects {}",
                self.embedder.name(),
                vector.len(),
                self.dimension
            )));
        }
        info!(dim = vector.len(), backend = self.embedder.name(), "invoice embedded");
        Ok(record.with_vector(vector))
    }
}
