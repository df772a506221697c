use std::sync::Arc;
use std::thread;

use invoice_dedup_index::{
    DistanceMetric, IndexEntry, IndexError, IndexSchema, SqliteIndex, VectorIndex,
};
use tempfile::tempdir;

fn schema() -> IndexSchema {
    IndexSchema::new("invoices", 3)
}

#[test]
fn entries_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    {
        let index = SqliteIndex::open(&path).unwrap();
        index.create(&schema()).unwrap();
        index
            .insert(
                "invoices",
                &IndexEntry {
                    id: "invoice:1".to_string(),
                    customer_name: "Acme".to_string(),
                    file: "a.pdf".to_string(),
                    vector: vec![0.1, 0.2, 0.3],
                },
            )
            .unwrap();
    }
    let reopened = SqliteIndex::open(&path).unwrap();
    assert!(reopened.exists("invoices").unwrap());
    assert_eq!(reopened.len("invoices").unwrap(), 1);
    let stored = reopened.schema("invoices").unwrap().unwrap();
    assert_eq!(stored.metric, DistanceMetric::Cosine);
    assert_eq!(stored.dimension, 3);

    let hits = reopened
        .query("invoices", "Acme", &[0.1, 0.2, 0.3], 1)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file, "a.pdf");
    assert!(hits[0].distance.abs() < 1e-5);
}

#[test]
fn second_create_reports_already_exists() {
    let dir = tempdir().unwrap();
    let index = SqliteIndex::open(dir.path().join("index.sqlite")).unwrap();
    index.create(&schema()).unwrap();
    assert!(matches!(
        index.create(&schema()),
        Err(IndexError::AlreadyExists(_))
    ));
}

#[test]
fn concurrent_creates_leave_exactly_one_schema() {
    let dir = tempdir().unwrap();
    let index = Arc::new(SqliteIndex::open(dir.path().join("index.sqlite")).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || index.create(&schema()))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|r| r.is_ok()).count();
    let raced = results
        .iter()
        .filter(|r| matches!(r, Err(IndexError::AlreadyExists(_))))
        .count();
    assert_eq!(created, 1);
    assert_eq!(raced, 3);
}

#[test]
fn query_only_sees_the_requested_customer() {
    let dir = tempdir().unwrap();
    let index = SqliteIndex::open(dir.path().join("index.sqlite")).unwrap();
    index.create(&schema()).unwrap();
    for (id, customer) in [("invoice:1", "Acme"), ("invoice:2", "Globex")] {
        index
            .insert(
                "invoices",
                &IndexEntry {
                    id: id.to_string(),
                    customer_name: customer.to_string(),
                    file: format!("{id}.pdf"),
                    vector: vec![1.0, 0.0, 0.0],
                },
            )
            .unwrap();
    }
    let hits = index.query("invoices", "Globex", &[1.0, 0.0, 0.0], 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "invoice:2");
}
