//! Vector index services used by the dedup engine.
//!
//! An index is a named collection of [`IndexEntry`] values that answers
//! nearest-neighbour queries filtered by customer name. Two services are
//! provided: [`MemoryIndex`] for tests and single-process runs, and
//! [`SqliteIndex`] for an index that persists across runs.

mod distance;
mod error;
mod memory;
mod schema;
mod sqlite;

pub use distance::distance;
pub use error::{IndexError, Result};
pub use memory::MemoryIndex;
pub use schema::{AnnAlgorithm, DistanceMetric, IndexEntry, IndexSchema, Neighbor, VectorDataType};
pub use sqlite::SqliteIndex;

/// Query/insert surface of a vector-search service.
///
/// Implementations must be safe to share between worker threads. `create`
/// reports [`IndexError::AlreadyExists`] instead of replacing an existing
/// index so callers can treat a lost creation race as success.
pub trait VectorIndex: Send + Sync {
    fn exists(&self, name: &str) -> Result<bool>;

    fn schema(&self, name: &str) -> Result<Option<IndexSchema>>;

    fn create(&self, schema: &IndexSchema) -> Result<()>;

    /// Returns up to `k` entries tagged with `customer_name`, closest first.
    fn query(
        &self,
        name: &str,
        customer_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>>;

    fn insert(&self, name: &str, entry: &IndexEntry) -> Result<()>;

    fn len(&self, name: &str) -> Result<usize>;
}

pub(crate) fn check_dimension(schema: &IndexSchema, vector: &[f32]) -> Result<()> {
    if vector.len() != schema.dimension {
        return Err(IndexError::Dimension {
            expected: schema.dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

pub(crate) fn nearest<'a, I>(schema: &IndexSchema, candidates: I, vector: &[f32], k: usize) -> Vec<Neighbor>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a [f32])>,
{
    let mut hits: Vec<Neighbor> = candidates
        .into_iter()
        .map(|(id, file, stored)| Neighbor {
            id: id.to_string(),
            file: file.to_string(),
            distance: distance(schema.metric, vector, stored),
        })
        .collect();
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}
