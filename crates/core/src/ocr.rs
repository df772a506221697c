use serde::{Deserialize, Serialize};

use crate::model::{FieldValue, LineItem, RecognizedDocument};

pub const ITEMS_FIELD: &str = "Items";
pub const CUSTOMER_FIELD: &str = "CustomerName";
pub const UNKNOWN_CUSTOMER: &str = "unknown";

/// Which recognized fields feed the embedding text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default = "default_customer_field")]
    pub customer_field: String,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            customer_field: default_customer_field(),
        }
    }
}

impl FieldSelection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            customer_field: default_customer_field(),
        }
    }

    /// Field names in visiting order: sorted, without repeats.
    pub fn ordered(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

fn default_fields() -> Vec<String> {
    ["CustomerName", "InvoiceTotal", "Items", "VendorName"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_customer_field() -> String {
    CUSTOMER_FIELD.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrProjection {
    pub customer_name: String,
    pub text: String,
}

/// Flattens the selected fields into `"<Name> <value> "` segments.
pub fn project_document(doc: &RecognizedDocument, selection: &FieldSelection) -> OcrProjection {
    let mut text = String::new();
    for name in selection.ordered() {
        let Some(field) = doc.get(name) else {
            continue;
        };
        let value = render_field(field);
        // Blank values add no "<Name>" label; an empty field and an absent
        // one project to the same text.
        if value.is_empty() {
            continue;
        }
        text.push_str(name);
        text.push(' ');
        text.push_str(&value);
        text.push(' ');
    }
    let customer_name = doc
        .get(&selection.customer_field)
        .map(render_field)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string());
    OcrProjection {
        customer_name,
        text,
    }
}

fn render_field(field: &FieldValue) -> String {
    match field {
        FieldValue::Scalar(value) => collapse_whitespace(value),
        FieldValue::LineItems(items) => {
            let mut out = String::new();
            for item in items {
                render_item(item, &mut out);
            }
            collapse_whitespace(&out)
        }
    }
}

fn render_item(item: &LineItem, out: &mut String) {
    let parts = [
        ("Description", &item.description),
        ("Quantity", &item.quantity),
        ("Amount", &item.amount),
    ];
    for (label, value) in parts {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            out.push_str(label);
            out.push(' ');
            out.push_str(value);
            out.push(' ');
        }
    }
}

/// Newlines become spaces, runs of spaces shrink to one, ends are trimmed.
fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_space = true;
    for ch in value.chars() {
        let ch = if matches!(ch, '\n' | '\r') { ' ' } else { ch };
        if ch == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}
