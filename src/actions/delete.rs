//! Duplicate deletion, permanent or via the trash crate.
//!
//! # Overview
//!
//! [`delete_duplicates`] removes every additional member of every duplicate
//! group, leaving each keeper in place:
//! - Permanent deletion (default) or move to system trash (recoverable)
//! - TOCTOU verification against the scanned size and mtime
//! - Keeper check: a group whose keeper has vanished is left alone
//! - Errors are collected per file; the batch always runs to the end
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::actions::delete::{delete_file, DeleteConfig};
//! use dupefinder::scanner::FileDescriptor;
//! use std::path::PathBuf;
//!
//! let desc = FileDescriptor::new(PathBuf::from("/path/to/duplicate.txt"), 10, 0);
//! match delete_file(&desc, &DeleteConfig::trash()) {
//!     Ok(size) => println!("Reclaimed {} bytes", size),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{has_changed, ActionKind, ActionReport};
use crate::duplicates::DuplicateMap;
use crate::scanner::FileDescriptor;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan (TOCTOU protection).
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The group's keeper is gone, so deleting would lose the last copy.
    #[error("keeper no longer exists: {0}")]
    KeeperMissing(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being deleted
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::KeeperMissing(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Configuration for deletion operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfig {
    /// Move files to the system trash instead of unlinking them.
    pub to_trash: bool,
    /// Verify size and mtime before deletion (TOCTOU protection).
    pub verify_unchanged: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            to_trash: false,
            verify_unchanged: true,
        }
    }
}

impl DeleteConfig {
    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self::default()
    }

    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self {
            to_trash: true,
            ..Self::default()
        }
    }

    /// Enable/disable TOCTOU verification.
    #[must_use]
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }

    fn kind(&self) -> ActionKind {
        if self.to_trash {
            ActionKind::Trash
        } else {
            ActionKind::Delete
        }
    }
}

/// Delete the file described by `desc`, returning the bytes reclaimed.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `Modified` if verification is enabled and size or mtime changed
/// - `TrashFailed` if the trash operation fails
/// - `PermissionDenied` or `Io` if removal fails
pub fn delete_file(desc: &FileDescriptor, config: &DeleteConfig) -> Result<u64, DeleteError> {
    let path = desc.action_path();

    if config.verify_unchanged {
        if has_changed(path, desc).map_err(|e| DeleteError::from_io(path, e))? {
            return Err(DeleteError::Modified(path.to_path_buf()));
        }
    } else if fs::symlink_metadata(path).is_err() {
        return Err(DeleteError::NotFound(path.to_path_buf()));
    }

    if config.to_trash {
        trash::delete(path).map_err(|e| DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::info!("Moved to trash: {} ({} bytes)", path.display(), desc.size);
    } else {
        fs::remove_file(path).map_err(|e| DeleteError::from_io(path, e))?;
        log::info!("Deleted: {} ({} bytes)", path.display(), desc.size);
    }

    Ok(desc.size)
}

/// Delete every additional member of every group.
///
/// Keepers are never touched. A group whose keeper no longer exists is
/// skipped entirely and each of its members is reported as a failure.
#[must_use]
pub fn delete_duplicates(groups: &DuplicateMap, config: &DeleteConfig) -> ActionReport {
    let mut report = ActionReport::new(config.kind());

    for group in groups.values() {
        let keeper = group.keeper();
        if !keeper.exists() {
            let error = DeleteError::KeeperMissing(keeper.action_path().to_path_buf());
            for member in group.additional() {
                report.record_failure(member.action_path(), &error);
            }
            continue;
        }

        for member in group.additional() {
            match delete_file(member, config) {
                Ok(size) => report.record_success(member.action_path().to_path_buf(), size),
                Err(e) => report.record_failure(e.path(), &e),
            }
        }
    }

    log::info!("{}", report.summary());
    report
}
