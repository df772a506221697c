use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index {0} already exists")]
    AlreadyExists(String),
    #[error("index {0} does not exist")]
    Missing(String),
    #[error("index {name} schema mismatch: {detail}")]
    SchemaMismatch { name: String, detail: String },
    #[error("vector dimension {actual} does not match index dimension {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("entry {0} already present")]
    DuplicateId(String),
    #[error("stored vector for {0} is corrupt")]
    CorruptVector(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
