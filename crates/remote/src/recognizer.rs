use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::debug;

use invoice_dedup_core::{
    DedupError, DocumentRecognizer, FieldValue, LineItem, RecognizedDocument, Result,
};

use crate::http::{decode_json, send_error, status_error};

const SERVICE: &str = "ocr";

/// Azure Form Recognizer / Document Intelligence client for the
/// asynchronous analyze API: submit bytes, then poll the operation.
#[derive(Clone)]
pub struct AzureRecognizer {
    http: Client,
    endpoint: String,
    key: String,
    model: String,
    api_version: String,
    locale: String,
    poll_interval: Duration,
    max_polls: usize,
}

impl AzureRecognizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        endpoint: &str,
        key: String,
        model: String,
        api_version: String,
        locale: String,
        poll_interval: Duration,
        max_polls: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(DedupError::Config("missing recognition service key".into()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(DedupError::Config(
                "recognition endpoint must be an http(s) URL".into(),
            ));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DedupError::Config(format!("failed to build ocr client: {err}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.trim().to_string(),
            model,
            api_version,
            locale,
            poll_interval,
            max_polls: max_polls.max(1),
        })
    }

    fn submit(&self, bytes: Vec<u8>) -> Result<String> {
        let url = format!(
            "{}/formrecognizer/documentModels/{}:analyze",
            self.endpoint, self.model
        );
        let response = self
            .http
            .post(&url)
            .query(&[
                ("api-version", self.api_version.as_str()),
                ("locale", self.locale.as_str()),
            ])
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .map_err(|err| send_error(SERVICE, err))?;
        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().unwrap_or_default();
            if status.is_success() {
                return Err(DedupError::Fatal(format!(
                    "ocr analyze answered {status} without an operation"
                )));
            }
            return Err(status_error(SERVICE, status, &body));
        }
        response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| DedupError::Fatal("ocr analyze response lacks Operation-Location".into()))
    }

    fn poll(&self, operation: &str) -> Result<RecognizedDocument> {
        for poll in 1..=self.max_polls {
            thread::sleep(self.poll_interval);
            let response = self
                .http
                .get(operation)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .map_err(|err| send_error(SERVICE, err))?;
            let value = decode_json(SERVICE, response)?;
            let status = value.get("status").and_then(Value::as_str).unwrap_or("");
            debug!(poll, status, "ocr operation polled");
            match status {
                "succeeded" => return parse_analyze_result(&value),
                "failed" => {
                    let message = value
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .unwrap_or("analysis failed");
                    return Err(DedupError::Fatal(format!("ocr analysis failed: {message}")));
                }
                _ => continue,
            }
        }
        Err(DedupError::Transient(format!(
            "ocr analysis still running after {} polls",
            self.max_polls
        )))
    }
}

impl DocumentRecognizer for AzureRecognizer {
    fn name(&self) -> &str {
        "azure"
    }

    fn recognize(&self, path: &Path) -> Result<RecognizedDocument> {
        let bytes = fs::read(path).map_err(|source| DedupError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let operation = self.submit(bytes)?;
        self.poll(&operation)
    }
}

/// Reads the first document of an analyze-operation body.
pub fn parse_analyze_result(value: &Value) -> Result<RecognizedDocument> {
    let fields = value
        .pointer("/analyzeResult/documents/0/fields")
        .and_then(Value::as_object)
        .ok_or_else(|| DedupError::Fatal("ocr result contains no documents".into()))?;
    let mut doc = RecognizedDocument::new();
    for (name, field) in fields {
        if let Some(value) = convert_field(field) {
            doc.fields.insert(name.clone(), value);
        }
    }
    Ok(doc)
}

fn convert_field(field: &Value) -> Option<FieldValue> {
    if let Some(items) = field.get("valueArray").and_then(Value::as_array) {
        let items = items
            .iter()
            .filter_map(|item| item.get("valueObject").and_then(Value::as_object))
            .map(line_item)
            .collect();
        return Some(FieldValue::LineItems(items));
    }
    scalar_text(field).map(FieldValue::Scalar)
}

fn line_item(object: &Map<String, Value>) -> LineItem {
    LineItem {
        description: object.get("Description").and_then(scalar_text),
        quantity: object.get("Quantity").and_then(scalar_text),
        amount: object.get("Amount").and_then(scalar_text),
    }
}

fn scalar_text(field: &Value) -> Option<String> {
    if let Some(text) = field.get("valueString").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    if let Some(currency) = field.get("valueCurrency") {
        let amount = currency.get("amount").map(number_text)?;
        let symbol = currency
            .get("currencySymbol")
            .and_then(Value::as_str)
            .unwrap_or("");
        return Some(format!("{symbol}{amount}"));
    }
    for key in ["valueNumber", "valueInteger"] {
        if let Some(number) = field.get(key) {
            return Some(number_text(number));
        }
    }
    if let Some(date) = field.get("valueDate").and_then(Value::as_str) {
        return Some(date.to_string());
    }
    field
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn number_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Offline recognizer: each inbox file is itself a JSON object mapping
/// field names to strings, numbers, or (for line items) arrays of objects.
#[derive(Debug, Clone, Default)]
pub struct FixtureRecognizer;

impl FixtureRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRecognizer for FixtureRecognizer {
    fn name(&self) -> &str {
        "fixture"
    }

    fn recognize(&self, path: &Path) -> Result<RecognizedDocument> {
        let raw = fs::read_to_string(path).map_err(|source| DedupError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|err| {
            DedupError::Fatal(format!("{} is not a fixture document: {err}", path.display()))
        })?;
        let object = value.as_object().ok_or_else(|| {
            DedupError::Fatal(format!("{} must hold a JSON object", path.display()))
        })?;
        let mut doc = RecognizedDocument::new();
        for (name, field) in object {
            let converted = match field {
                Value::Array(items) => FieldValue::LineItems(
                    items
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|item| LineItem {
                            description: item.get("Description").map(number_text),
                            quantity: item.get("Quantity").map(number_text),
                            amount: item.get("Amount").map(number_text),
                        })
                        .collect(),
                ),
                Value::Null => continue,
                other => FieldValue::Scalar(number_text(other)),
            };
            doc.fields.insert(name.clone(), converted);
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_scalar_currency_and_items() {
        let body = json!({
            "status": "succeeded",
            "analyzeResult": {
                "documents": [{
                    "fields": {
                        "CustomerName": { "type": "string", "valueString": "Acme", "content": "ACME" },
                        "InvoiceTotal": {
                            "type": "currency",
                            "valueCurrency": { "amount": 110.5, "currencySymbol": "$" },
                            "content": "$110.50"
                        },
                        "InvoiceDate": { "type": "date", "valueDate": "2023-01-02", "content": "Jan 2" },
                        "Items": {
                            "type": "array",
                            "valueArray": [{
                                "type": "object",
                                "valueObject": {
                                    "Description": { "valueString": "Consulting" },
                                    "Quantity": { "valueNumber": 2 },
                                    "Amount": { "valueCurrency": { "amount": 100 } }
                                }
                            }]
                        }
                    }
                }]
            }
        });
        let doc = parse_analyze_result(&body).unwrap();
        assert_eq!(
            doc.get("CustomerName"),
            Some(&FieldValue::Scalar("Acme".into()))
        );
        assert_eq!(
            doc.get("InvoiceTotal"),
            Some(&FieldValue::Scalar("$110.5".into()))
        );
        assert_eq!(
            doc.get("InvoiceDate"),
            Some(&FieldValue::Scalar("2023-01-02".into()))
        );
        assert_eq!(
            doc.get("Items"),
            Some(&FieldValue::LineItems(vec![LineItem {
                description: Some("Consulting".into()),
                quantity: Some("2".into()),
                amount: Some("100".into()),
            }]))
        );
    }

    #[test]
    fn empty_result_is_fatal() {
        let body = json!({ "status": "succeeded", "analyzeResult": { "documents": [] } });
        let err = parse_analyze_result(&body).unwrap_err();
        assert!(matches!(err, DedupError::Fatal(_)));
    }
}
