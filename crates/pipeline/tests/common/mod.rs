#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use invoice_dedup_core::index::{
    IndexEntry, IndexSchema, MemoryIndex, Neighbor, Result as IndexResult, VectorIndex,
};
use invoice_dedup_core::{
    DedupError, DocumentRecognizer, Embedder, IndexConfig, RecognizedDocument, Result,
    RetryPolicy, StorageConfig,
};
use invoice_dedup_pipeline::{PipelineConfig, PipelineCoordinator};
use tempfile::TempDir;

/// Recognizer keyed by file name. Files without an entry fail fatally.
#[derive(Default)]
pub struct ScriptedRecognizer {
    pub documents: HashMap<String, RecognizedDocument>,
    pub transient_failures: HashMap<String, usize>,
    pub attempts: Mutex<HashMap<String, usize>>,
    pub calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn with(mut self, file: &str, customer: &str, body: &str) -> Self {
        self.documents.insert(
            file.to_string(),
            RecognizedDocument::new()
                .with_scalar("CustomerName", customer)
                .with_scalar("VendorName", body),
        );
        self
    }

    pub fn failing(mut self, file: &str, times: usize) -> Self {
        self.transient_failures.insert(file.to_string(), times);
        self
    }
}

impl DocumentRecognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, path: &Path) -> Result<RecognizedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let seen = attempts.entry(name.clone()).or_insert(0);
            *seen += 1;
            *seen
        };
        if let Some(times) = self.transient_failures.get(&name) {
            if attempt <= *times {
                return Err(DedupError::Transient(format!("{name}: service busy")));
            }
        }
        self.documents
            .get(&name)
            .cloned()
            .ok_or_else(|| DedupError::Fatal(format!("{name}: corrupt document")))
    }
}

/// Embedder keyed by the vendor text that the scripted recognizer emits.
#[derive(Default)]
pub struct TableEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
    pub transient_failures: HashMap<String, usize>,
    pub attempts: Mutex<HashMap<String, usize>>,
    pub calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn with(mut self, body: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(body.to_string(), vector);
        self
    }

    pub fn failing(mut self, body: &str, times: usize) -> Self {
        self.transient_failures.insert(body.to_string(), times);
        self
    }
}

impl Embedder for TableEmbedder {
    fn name(&self) -> &str {
        "table"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (body, vector) = self
            .vectors
            .iter()
            .find(|(body, _)| text.contains(body.as_str()))
            .ok_or_else(|| DedupError::Fatal(format!("no vector for {text}")))?;
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let seen = attempts.entry(body.clone()).or_insert(0);
            *seen += 1;
            *seen
        };
        if let Some(times) = self.transient_failures.get(body) {
            if attempt <= *times {
                return Err(DedupError::Transient(format!("{body}: rate limited")));
            }
        }
        Ok(vector.clone())
    }
}

/// Memory index that puts a directory where `blocked` should land as soon
/// as an entry is written, so the move that follows cannot succeed.
pub struct BlockingIndex {
    pub inner: MemoryIndex,
    pub blocked: PathBuf,
}

impl VectorIndex for BlockingIndex {
    fn exists(&self, name: &str) -> IndexResult<bool> {
        self.inner.exists(name)
    }

    fn schema(&self, name: &str) -> IndexResult<Option<IndexSchema>> {
        self.inner.schema(name)
    }

    fn create(&self, schema: &IndexSchema) -> IndexResult<()> {
        self.inner.create(schema)
    }

    fn query(
        &self,
        name: &str,
        customer_name: &str,
        vector: &[f32],
        k: usize,
    ) -> IndexResult<Vec<Neighbor>> {
        self.inner.query(name, customer_name, vector, k)
    }

    fn insert(&self, name: &str, entry: &IndexEntry) -> IndexResult<()> {
        self.inner.insert(name, entry)?;
        fs::create_dir_all(&self.blocked).unwrap();
        Ok(())
    }

    fn len(&self, name: &str) -> IndexResult<usize> {
        self.inner.len(name)
    }
}

pub struct Workspace {
    pub dir: TempDir,
    pub storage: StorageConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            inbox: dir.path().join("inbox"),
            processed: dir.path().join("processed"),
            duplicates: dir.path().join("dups"),
            pattern: String::new(),
        };
        fs::create_dir_all(&storage.inbox).unwrap();
        Self { dir, storage }
    }

    pub fn drop_file(&self, name: &str) -> PathBuf {
        let path = self.storage.inbox.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    pub fn config(&self, bound: f32) -> PipelineConfig {
        let index = IndexConfig {
            dimension: 2,
            similarity_bound: bound,
            ..IndexConfig::default()
        };
        let mut config = PipelineConfig::new(self.storage.clone(), index);
        config.ocr_retry = RetryPolicy::immediate(3);
        config.embed_retry = RetryPolicy::immediate(3);
        config.workers = 4;
        config
    }

    /// Directories that currently hold a file named `name`.
    pub fn locations(&self, name: &str) -> Vec<&'static str> {
        let mut found = Vec::new();
        if self.storage.inbox.join(name).exists() {
            found.push("inbox");
        }
        if self.storage.processed.join(name).exists() {
            found.push("processed");
        }
        if self.storage.duplicates.join(name).exists() {
            found.push("duplicates");
        }
        found
    }
}

pub fn coordinator(
    config: &PipelineConfig,
    recognizer: ScriptedRecognizer,
    embedder: TableEmbedder,
    index: Arc<MemoryIndex>,
) -> PipelineCoordinator {
    PipelineCoordinator::new(config, Arc::new(recognizer), Arc::new(embedder), index).unwrap()
}

/// Unit vector whose cosine similarity with `[1, 0]` is `similarity`.
pub fn at_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt()]
}
