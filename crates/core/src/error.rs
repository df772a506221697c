use std::path::PathBuf;

use invoice_dedup_index::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    #[error("transient service error: {0}")]
    Transient(String),
    #[error("service error: {0}")]
    Fatal(String),
    #[error("unreadable source file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{operation} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: usize,
        last: Box<DedupError>,
    },
    #[error("failed to move {path:?} into {dest:?}: {source}")]
    Relocation {
        path: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("index entry {entry_id} was written but {path:?} was not moved: {source}")]
    Inconsistent {
        entry_id: String,
        path: PathBuf,
        #[source]
        source: Box<DedupError>,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DedupError {
    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DedupError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;
