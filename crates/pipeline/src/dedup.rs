use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use invoice_dedup_core::index::{IndexEntry, IndexError, IndexSchema, VectorIndex};
use invoice_dedup_core::{move_to, relocate, reserve_target, DedupError, Disposition, InvoiceRecord, Result};

use crate::locks::CustomerLocks;

/// Result of the decide-and-commit step for one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub disposition: Disposition,
    /// `1 - distance` to the closest entry for the same customer.
    pub similarity: Option<f32>,
    /// Entry the invoice was judged a duplicate of.
    pub matched: Option<String>,
    /// Entry written for a new invoice.
    pub entry_id: Option<String>,
    pub destination: PathBuf,
}

/// Duplicate only when strictly above the bound; no neighbour means new.
pub fn classify(similarity: Option<f32>, bound: f32) -> Disposition {
    match similarity {
        Some(score) if score > bound => Disposition::Duplicate,
        _ => Disposition::New,
    }
}

pub fn similarity_label(similarity: Option<f32>) -> String {
    match similarity {
        Some(score) => format!("{score:.2}"),
        None => "N/A".to_string(),
    }
}

/// Owns the shared index: queries it, decides, inserts new entries and
/// moves the source file to its final directory.
pub struct DedupEngine {
    index: Arc<dyn VectorIndex>,
    schema: IndexSchema,
    similarity_bound: f32,
    processed: PathBuf,
    duplicates: PathBuf,
    locks: Option<CustomerLocks>,
    ready: AtomicBool,
}

impl DedupEngine {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        schema: IndexSchema,
        similarity_bound: f32,
        processed: impl Into<PathBuf>,
        duplicates: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            schema,
            similarity_bound,
            processed: processed.into(),
            duplicates: duplicates.into(),
            locks: None,
            ready: AtomicBool::new(false),
        }
    }

    /// Serialize query and insert per customer name within this engine.
    pub fn with_customer_locks(mut self) -> Self {
        self.locks = Some(CustomerLocks::new());
        self
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Creates the index when absent. Losing a creation race to another
    /// process is fine; finding an index with another dimension or metric
    /// is not.
    pub fn ensure_index(&self) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }
        let name = &self.schema.name;
        if !self.index.exists(name)? {
            match self.index.create(&self.schema) {
                Ok(()) => info!(
                    index = %name,
                    dim = self.schema.dimension,
                    metric = self.schema.metric.as_str(),
                    algorithm = self.schema.algorithm.as_str(),
                    datatype = self.schema.datatype.as_str(),
                    "vector index created"
                ),
                Err(IndexError::AlreadyExists(_)) => {
                    debug!(index = %name, "vector index created concurrently")
                }
                Err(err) => return Err(err.into()),
            }
        }
        let stored = self
            .index
            .schema(name)?
            .ok_or_else(|| IndexError::Missing(name.clone()))?;
        if let Some(detail) = stored.incompatibility(&self.schema) {
            return Err(IndexError::SchemaMismatch {
                name: name.clone(),
                detail,
            }
            .into());
        }
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    pub fn dedup(&self, record: &InvoiceRecord) -> Result<DedupOutcome> {
        let vector = record
            .vector
            .as_deref()
            .ok_or(DedupError::MissingField("vector"))?;
        self.ensure_index()?;

        let customer_lock = self
            .locks
            .as_ref()
            .map(|locks| locks.handle(&record.customer_name));
        let _guard = customer_lock.as_ref().map(|lock| lock.lock());

        let nearest = self
            .index
            .query(&self.schema.name, &record.customer_name, vector, 1)?
            .into_iter()
            .next();
        let similarity = nearest.as_ref().map(|hit| 1.0 - hit.distance);
        let disposition = classify(similarity, self.similarity_bound);
        let label = similarity_label(similarity);

        match disposition {
            Disposition::Duplicate => {
                let destination = relocate(&record.source, &self.duplicates)?;
                let matched = nearest.map(|hit| hit.id);
                info!(
                    customer = %record.customer_name,
                    disposition = %disposition,
                    similarity = %label,
                    matched = matched.as_deref().unwrap_or(""),
                    "duplicate invoice"
                );
                Ok(DedupOutcome {
                    disposition,
                    similarity,
                    matched,
                    entry_id: None,
                    destination,
                })
            }
            Disposition::New => {
                // The entry names the file as it will sit in processed/,
                // suffix included.
                let destination = reserve_target(&record.source, &self.processed)?;
                let entry = IndexEntry {
                    id: format!("{}{}", self.schema.prefix, Uuid::new_v4()),
                    customer_name: record.customer_name.clone(),
                    file: destination
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| record.file_name()),
                    vector: vector.to_vec(),
                };
                self.index.insert(&self.schema.name, &entry)?;
                self.commit_move(&record.source, &destination, &entry.id)?;
                info!(
                    customer = %record.customer_name,
                    disposition = %disposition,
                    similarity = %label,
                    entry = %entry.id,
                    "processed invoice"
                );
                Ok(DedupOutcome {
                    disposition,
                    similarity,
                    matched: None,
                    entry_id: Some(entry.id),
                    destination,
                })
            }
        }
    }

    fn commit_move(&self, source: &Path, destination: &Path, entry_id: &str) -> Result<()> {
        move_to(source, destination).map_err(|err| {
            error!(
                entry = entry_id,
                error = %err,
                "index entry written but invoice not moved to processed; manual cleanup required"
            );
            DedupError::Inconsistent {
                entry_id: entry_id.to_string(),
                path: source.to_path_buf(),
                source: Box::new(err),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_comparison_is_strict() {
        assert_eq!(classify(Some(0.95), 0.95), Disposition::New);
        assert_eq!(classify(Some(0.95 + 1e-4), 0.95), Disposition::Duplicate);
        assert_eq!(classify(Some(0.2), 0.95), Disposition::New);
    }

    #[test]
    fn no_neighbour_is_always_new() {
        assert_eq!(classify(None, 0.0), Disposition::New);
    }

    #[test]
    fn similarity_is_reported_with_two_decimals() {
        assert_eq!(similarity_label(Some(0.96789)), "0.97");
        assert_eq!(similarity_label(None), "N/A");
    }
}
