use std::fs;

use invoice_dedup_core::{
    project_document, DedupError, DocumentRecognizer, FieldSelection, FieldValue,
};
use invoice_dedup_remote::FixtureRecognizer;
use tempfile::tempdir;

#[test]
fn fixture_file_feeds_projection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.json");
    fs::write(
        &path,
        r#"{
            "CustomerName": "Acme",
            "InvoiceTotal": 110.5,
            "VendorName": null,
            "Items": [{"Description": "Widget", "Quantity": 2, "Amount": "100.00"}]
        }"#,
    )
    .unwrap();
    let doc = FixtureRecognizer::new().recognize(&path).unwrap();
    assert_eq!(
        doc.get("InvoiceTotal"),
        Some(&FieldValue::Scalar("110.5".into()))
    );
    assert!(doc.get("VendorName").is_none());

    let projection = project_document(&doc, &FieldSelection::default());
    assert_eq!(projection.customer_name, "Acme");
    assert_eq!(
        projection.text,
        "CustomerName Acme InvoiceTotal 110.5 Items Description Widget Quantity 2 Amount 100.00 "
    );
}

#[test]
fn corrupt_fixture_is_fatal_and_missing_file_unreadable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, "%PDF-1.7 not json").unwrap();
    let recognizer = FixtureRecognizer::new();
    assert!(matches!(
        recognizer.recognize(&path),
        Err(DedupError::Fatal(_))
    ));
    assert!(matches!(
        recognizer.recognize(&dir.path().join("gone.pdf")),
        Err(DedupError::Unreadable { .. })
    ));
}
