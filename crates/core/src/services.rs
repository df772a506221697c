use std::path::Path;

use crate::error::Result;
use crate::model::RecognizedDocument;

/// Remote document-recognition service.
///
/// Calls are read-only against the service, so the retry layer may repeat
/// them freely. Failures that may go away on their own must be reported as
/// [`crate::DedupError::Transient`].
pub trait DocumentRecognizer: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, path: &Path) -> Result<RecognizedDocument>;
}

/// Remote text-embedding service.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
