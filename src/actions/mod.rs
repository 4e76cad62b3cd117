//! File actions module.
//!
//! This module provides the two destructive actions applied to classified
//! duplicates. Both act on the additional (non-keeper) members of every group
//! and never touch the keeper:
//!
//! - [`delete`]: remove additional files, permanently or via the system trash
//! - [`link`]: replace additional files with hardlinks to the keeper
//!
//! # Safety
//!
//! Before acting on a file the executor checks that its size and modification
//! time still match what the scan recorded, and that the group's keeper still
//! exists. A failure on one file is recorded in the [`ActionReport`] and the
//! batch moves on.
//!
//! ```no_run
//! use dupefinder::actions::delete::{delete_duplicates, DeleteConfig};
//! use dupefinder::duplicates::classify;
//! use dupefinder::scanner::{Scan, ScanConfig};
//!
//! let mut scan = Scan::new(ScanConfig::default());
//! scan.add_root("./downloads");
//! scan.run();
//! let groups = classify(scan.index());
//! let report = delete_duplicates(&groups, &DeleteConfig::trash());
//! println!("{}", report.summary());
//! ```

pub mod delete;
pub mod link;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use filetime::FileTime;

use crate::scanner::FileDescriptor;

// Re-export commonly used types
pub use delete::{delete_duplicates, delete_file, DeleteConfig, DeleteError};
pub use link::{link_duplicates, replace_with_hardlink, LinkConfig, LinkError, LinkOutcome};

/// Which action produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Permanent removal
    Delete,
    /// Move to the system trash
    Trash,
    /// Hardlink replacement
    Link,
}

impl ActionKind {
    fn verb(self) -> &'static str {
        match self {
            Self::Delete => "Deleted",
            Self::Trash => "Moved to trash",
            Self::Link => "Linked",
        }
    }
}

/// One file the action succeeded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSuccess {
    /// Path acted on
    pub path: PathBuf,
    /// Bytes reclaimed
    pub size: u64,
}

/// Results of a batch action.
#[derive(Debug, Clone)]
pub struct ActionReport {
    /// Action that was performed
    pub kind: ActionKind,
    /// Files acted on successfully
    pub successes: Vec<ActionSuccess>,
    /// Files already in the desired state
    pub skipped: Vec<PathBuf>,
    /// Failed files with their error messages
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes reclaimed
    pub bytes_reclaimed: u64,
}

impl ActionReport {
    /// Create an empty report.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            successes: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            bytes_reclaimed: 0,
        }
    }

    pub(crate) fn record_success(&mut self, path: PathBuf, size: u64) {
        self.bytes_reclaimed = self.bytes_reclaimed.saturating_add(size);
        self.successes.push(ActionSuccess { path, size });
    }

    pub(crate) fn record_failure(&mut self, path: &Path, error: &dyn std::error::Error) {
        let message = error.to_string();
        log::warn!("{} failed for {}: {}", self.kind.verb(), path.display(), message);
        self.failures.push((path.to_path_buf(), message));
    }

    /// Number of successful operations.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed operations.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total number of attempted operations.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.skipped.len() + self.failures.len()
    }

    /// Check if every operation succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} {} file(s), reclaimed {}",
            self.kind.verb(),
            self.success_count(),
            ByteSize::b(self.bytes_reclaimed)
        );
        if !self.skipped.is_empty() {
            summary.push_str(&format!(", {} already linked", self.skipped.len()));
        }
        if !self.all_succeeded() {
            summary.push_str(&format!(", {} failed", self.failure_count()));
        }
        summary
    }
}

/// Whether the file at `path` no longer matches the size and mtime in `desc`.
///
/// Symlinks are not followed, so a file replaced by a link counts as changed.
pub(crate) fn has_changed(path: &Path, desc: &FileDescriptor) -> io::Result<bool> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_file() {
        return Ok(true);
    }
    let modified = FileTime::from_last_modification_time(&metadata).unix_seconds();
    Ok(metadata.len() != desc.size || modified != desc.modified)
}
