use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    InnerProduct,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
            DistanceMetric::InnerProduct => "inner_product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorDataType {
    #[default]
    Float32,
    Float64,
}

impl VectorDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorDataType::Float32 => "float32",
            VectorDataType::Float64 => "float64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnnAlgorithm {
    #[default]
    Hnsw,
    Flat,
}

impl AnnAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnAlgorithm::Hnsw => "hnsw",
            AnnAlgorithm::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub prefix: String,
    pub dimension: usize,
    #[serde(default)]
    pub datatype: VectorDataType,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub algorithm: AnnAlgorithm,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            prefix: "invoice:".to_string(),
            dimension,
            datatype: VectorDataType::default(),
            metric: DistanceMetric::default(),
            algorithm: AnnAlgorithm::default(),
        }
    }

    /// Describes the first difference that would make stored distances
    /// meaningless for a caller expecting `other`.
    pub fn incompatibility(&self, other: &IndexSchema) -> Option<String> {
        if self.dimension != other.dimension {
            return Some(format!(
                "dimension {} != {}",
                self.dimension, other.dimension
            ));
        }
        if self.metric != other.metric {
            return Some(format!(
                "metric {} != {}",
                self.metric.as_str(),
                other.metric.as_str()
            ));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub customer_name: String,
    pub file: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub file: String,
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_deserializes_with_defaults() {
        let schema: IndexSchema =
            serde_json::from_str(r#"{"name":"invoices","prefix":"invoice:","dimension":3}"#)
                .unwrap();
        assert_eq!(schema.metric, DistanceMetric::Cosine);
        assert_eq!(schema.algorithm, AnnAlgorithm::Hnsw);
        assert_eq!(schema.datatype, VectorDataType::Float32);
    }

    #[test]
    fn incompatibility_reports_dimension_first() {
        let a = IndexSchema::new("invoices", 4);
        let mut b = IndexSchema::new("invoices", 8);
        b.metric = DistanceMetric::L2;
        assert_eq!(a.incompatibility(&b).unwrap(), "dimension 4 != 8");
        assert!(a.incompatibility(&a.clone()).is_none());
    }
}
