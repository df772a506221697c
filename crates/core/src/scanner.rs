use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{DedupError, Result};
use crate::model::WorkItem;

/// Lists the files waiting in the inbox. Holds no state between scans.
#[derive(Debug, Clone)]
pub struct InboxScanner {
    inbox: PathBuf,
    patterns: Vec<Pattern>,
}

impl InboxScanner {
    /// `pattern` is a comma separated list of basename globs; empty accepts
    /// every file.
    pub fn new(inbox: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        Ok(Self {
            inbox: inbox.into(),
            patterns: build_patterns(pattern)?,
        })
    }

    pub fn inbox(&self) -> &Path {
        &self.inbox
    }

    pub fn scan(&self) -> Result<Vec<WorkItem>> {
        if !self.inbox.is_dir() {
            return Err(DedupError::Config(format!(
                "inbox {} is not a directory",
                self.inbox.display()
            )));
        }
        let mut items = Vec::new();
        for entry in WalkDir::new(&self.inbox).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                DedupError::Io(err.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "inbox walk failed")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            let lowered = name.to_lowercase();
            if !self.patterns.is_empty() && !self.patterns.iter().any(|p| p.matches(&lowered)) {
                continue;
            }
            items.push(WorkItem::new(entry.path()));
        }
        items.sort();
        debug!(inbox = %self.inbox.display(), files = items.len(), "inbox scanned");
        Ok(items)
    }
}

fn build_patterns(pattern: &str) -> Result<Vec<Pattern>> {
    let mut patterns = Vec::new();
    for raw in pattern.split(',') {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        patterns.push(
            Pattern::new(&trimmed.to_lowercase())
                .map_err(|e| DedupError::Config(format!("bad inbox pattern {trimmed}: {}", e.msg)))?,
        );
    }
    Ok(patterns)
}
