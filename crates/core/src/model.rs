use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One file claimed from the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItem {
    path: PathBuf,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        basename(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    New,
    Duplicate,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::New => "new",
            Disposition::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State carried by a single file's pipeline. Each stage only adds to it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRecord {
    pub source: PathBuf,
    pub customer_name: String,
    pub ocr_text: String,
    pub vector: Option<Vec<f32>>,
    pub disposition: Option<Disposition>,
}

impl InvoiceRecord {
    pub fn new(source: impl Into<PathBuf>, customer_name: String, ocr_text: String) -> Self {
        Self {
            source: source.into(),
            customer_name,
            ocr_text,
            vector: None,
            disposition: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn finalize(mut self, disposition: Disposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    pub fn file_name(&self) -> String {
        basename(&self.source)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<String>,
    #[serde(rename = "Amount", default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    LineItems(Vec<LineItem>),
}

/// Named fields returned by the recognition service for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedDocument {
    pub fields: BTreeMap<String, FieldValue>,
}

impl RecognizedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Scalar(value.into()));
        self
    }

    pub fn with_items(mut self, name: impl Into<String>, items: Vec<LineItem>) -> Self {
        self.fields.insert(name.into(), FieldValue::LineItems(items));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_stage_outputs() {
        let record = InvoiceRecord::new("/in/a.pdf", "Acme".into(), "CustomerName Acme ".into())
            .with_vector(vec![0.5, 0.5])
            .finalize(Disposition::New);
        assert_eq!(record.file_name(), "a.pdf");
        assert_eq!(record.vector.as_deref(), Some(&[0.5, 0.5][..]));
        assert_eq!(record.disposition, Some(Disposition::New));
    }

    #[test]
    fn field_values_deserialize_untagged() {
        let doc: RecognizedDocument = serde_json::from_str(
            r#"{"fields":{"CustomerName":"Acme","Items":[{"Description":"Widget","Amount":"10"}]}}"#,
        )
        .unwrap();
        assert_eq!(
            doc.get("CustomerName"),
            Some(&FieldValue::Scalar("Acme".to_string()))
        );
        match doc.get("Items") {
            Some(FieldValue::LineItems(items)) => {
                assert_eq!(items[0].description.as_deref(), Some("Widget"));
                assert!(items[0].quantity.is_none());
            }
            other => panic!("unexpected items value {other:?}"),
        }
    }
}
