use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DedupError, Result};
use invoice_dedup_index::{AnnAlgorithm, DistanceMetric, IndexSchema, VectorDataType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub inbox: PathBuf,
    pub processed: PathBuf,
    pub duplicates: PathBuf,
    #[serde(default)]
    pub pattern: String,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        let dirs = [
            ("inbox", &self.inbox),
            ("processed", &self.processed),
            ("duplicates", &self.duplicates),
        ];
        for (i, (a_name, a)) in dirs.iter().enumerate() {
            for (b_name, b) in dirs.iter().skip(i + 1) {
                if a == b {
                    return Err(DedupError::Config(format!(
                        "storage.{a_name} and storage.{b_name} must differ"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub datatype: VectorDataType,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub algorithm: AnnAlgorithm,
    #[serde(default = "default_similarity_bound")]
    pub similarity_bound: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            prefix: default_prefix(),
            dimension: default_dimension(),
            datatype: VectorDataType::default(),
            metric: DistanceMetric::default(),
            algorithm: AnnAlgorithm::default(),
            similarity_bound: default_similarity_bound(),
        }
    }
}

impl IndexConfig {
    pub fn schema(&self) -> IndexSchema {
        IndexSchema {
            name: self.name.clone(),
            prefix: self.prefix.clone(),
            dimension: self.dimension,
            datatype: self.datatype,
            metric: self.metric,
            algorithm: self.algorithm,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DedupError::Config("index.name is required".into()));
        }
        if self.dimension == 0 {
            return Err(DedupError::Config("index.dimension must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.similarity_bound) {
            return Err(DedupError::Config(format!(
                "index.similarity_bound {} is outside [0, 1]",
                self.similarity_bound
            )));
        }
        Ok(())
    }
}

fn default_index_name() -> String {
    "invoices".to_string()
}

fn default_prefix() -> String {
    "invoice:".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_similarity_bound() -> f32 {
    0.95
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_dirs_must_be_distinct() {
        let cfg = StorageConfig {
            inbox: "/inv/inbox".into(),
            processed: "/inv/processed".into(),
            duplicates: "/inv/processed".into(),
            pattern: String::new(),
        };
        assert!(matches!(cfg.validate(), Err(DedupError::Config(_))));
    }

    #[test]
    fn index_bound_is_checked() {
        let mut cfg = IndexConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.similarity_bound = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn schema_carries_configured_values() {
        let cfg = IndexConfig {
            dimension: 8,
            metric: DistanceMetric::L2,
            ..IndexConfig::default()
        };
        let schema = cfg.schema();
        assert_eq!(schema.dimension, 8);
        assert_eq!(schema.metric, DistanceMetric::L2);
        assert_eq!(schema.prefix, "invoice:");
    }
}
