mod config;
mod embedding;
mod error;
mod model;
mod ocr;
mod relocate;
mod retry;
mod scanner;
mod services;

pub use config::{IndexConfig, StorageConfig};
pub use embedding::{HashEmbedder, HashEmbedderConfig};
pub use error::{DedupError, Result};
pub use model::{
    Disposition, FieldValue, InvoiceRecord, LineItem, RecognizedDocument, WorkItem,
};
pub use ocr::{
    project_document, FieldSelection, OcrProjection, CUSTOMER_FIELD, ITEMS_FIELD, UNKNOWN_CUSTOMER,
};
pub use relocate::{move_to, relocate, reserve_target};
pub use retry::{call_with_retry, call_with_retry_using, RetryPolicy};
pub use scanner::InboxScanner;
pub use services::{DocumentRecognizer, Embedder};

pub use invoice_dedup_index as index;
