use std::thread;
use std::time::Duration;

use tracing::{debug, error, info};

use invoice_dedup_core::{InboxScanner, Result};

use crate::coordinator::{BatchReport, PipelineCoordinator};

/// Fixed-interval trigger: scan the inbox, hand any files to the
/// coordinator, sleep, repeat.
pub struct Poller<'a> {
    scanner: InboxScanner,
    coordinator: &'a PipelineCoordinator,
    interval: Duration,
}

impl<'a> Poller<'a> {
    pub fn new(
        scanner: InboxScanner,
        coordinator: &'a PipelineCoordinator,
        interval: Duration,
    ) -> Self {
        Self {
            scanner,
            coordinator,
            interval,
        }
    }

    /// One scan plus batch. `None` when the inbox was empty.
    pub fn poll_once(&self) -> Result<Option<BatchReport>> {
        let items = self.scanner.scan()?;
        info!(files = items.len(), inbox = %self.scanner.inbox().display(), "inbox polled");
        if items.is_empty() {
            return Ok(None);
        }
        self.coordinator.run_batch(&items).map(Some)
    }

    /// Polls until `max_polls` is reached, forever when `None`. Batch-level
    /// failures are logged and the next poll still happens.
    pub fn run(&self, max_polls: Option<usize>) -> usize {
        let mut polls = 0usize;
        loop {
            if max_polls.is_some_and(|max| polls >= max) {
                return polls;
            }
            polls += 1;
            match self.poll_once() {
                Ok(Some(report)) => debug!(files = report.len(), "poll handled batch"),
                Ok(None) => {}
                Err(err) => error!(error = %err, "poll failed"),
            }
            if max_polls.is_some_and(|max| polls >= max) {
                return polls;
            }
            thread::sleep(self.interval);
        }
    }
}
