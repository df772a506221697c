use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// One mutex per customer name, created on first use.
///
/// Holding a customer's mutex across query and insert means two invoices
/// for the same customer in one process are decided one after the other.
#[derive(Default)]
pub struct CustomerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, customer: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(customer.to_string()).or_default())
    }
}
