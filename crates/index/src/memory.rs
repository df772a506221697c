use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    check_dimension, nearest, IndexEntry, IndexError, IndexSchema, Neighbor, Result, VectorIndex,
};

struct Collection {
    schema: IndexSchema,
    entries: Vec<IndexEntry>,
}

/// Process-local index. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for MemoryIndex {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    fn schema(&self, name: &str) -> Result<Option<IndexSchema>> {
        Ok(self
            .collections
            .read()
            .get(name)
            .map(|collection| collection.schema.clone()))
    }

    fn create(&self, schema: &IndexSchema) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(&schema.name) {
            return Err(IndexError::AlreadyExists(schema.name.clone()));
        }
        debug!(index = %schema.name, dim = schema.dimension, "creating in-memory index");
        collections.insert(
            schema.name.clone(),
            Collection {
                schema: schema.clone(),
                entries: Vec::new(),
            },
        );
        Ok(())
    }

    fn query(
        &self,
        name: &str,
        customer_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let collections = self.collections.read();
        let collection = collections
            .get(name)
            .ok_or_else(|| IndexError::Missing(name.to_string()))?;
        check_dimension(&collection.schema, vector)?;
        let candidates = collection
            .entries
            .iter()
            .filter(|entry| entry.customer_name == customer_name)
            .map(|entry| (entry.id.as_str(), entry.file.as_str(), entry.vector.as_slice()));
        Ok(nearest(&collection.schema, candidates, vector, k))
    }

    fn insert(&self, name: &str, entry: &IndexEntry) -> Result<()> {
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| IndexError::Missing(name.to_string()))?;
        check_dimension(&collection.schema, &entry.vector)?;
        if collection.entries.iter().any(|existing| existing.id == entry.id) {
            return Err(IndexError::DuplicateId(entry.id.clone()));
        }
        collection.entries.push(entry.clone());
        Ok(())
    }

    fn len(&self, name: &str) -> Result<usize> {
        self.collections
            .read()
            .get(name)
            .map(|collection| collection.entries.len())
            .ok_or_else(|| IndexError::Missing(name.to_string()))
    }
}
