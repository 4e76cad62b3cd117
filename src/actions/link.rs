//! Hardlink replacement of duplicates.
//!
//! # Overview
//!
//! [`replace_with_hardlink`] turns an additional file into another name for
//! the keeper's storage object without the original path ever going missing:
//!
//! 1. create a placeholder in the target's directory and remove it at once,
//!    which reserves a unique name on the same filesystem;
//! 2. hardlink the keeper to that reserved name;
//! 3. rename the new link over the target.
//!
//! Rename is atomic within one filesystem, so readers see either the old file
//! or the link. If any step before the rename fails the target is untouched.
//! Linking across filesystems fails and is reported, never retried as a copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{has_changed, ActionKind, ActionReport};
use crate::duplicates::DuplicateMap;
use crate::scanner::hardlink::storage_id;
use crate::scanner::FileDescriptor;

/// Error type for hardlink replacement.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The file to replace was not found.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The keeper was not found.
    #[error("keeper no longer exists: {0}")]
    KeeperMissing(PathBuf),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The file or the keeper changed since the scan (TOCTOU protection).
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Keeper and target live on different filesystems.
    #[error("cannot hardlink across filesystems: {keeper} -> {target}")]
    CrossDevice {
        /// Link source
        keeper: PathBuf,
        /// File that would have been replaced
        target: PathBuf,
    },

    /// No temporary name could be reserved next to the target.
    #[error("failed to reserve a temporary name next to {path}: {source}")]
    Reserve {
        /// File being replaced
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Creating the hardlink failed.
    #[error("failed to link {path}: {source}")]
    Link {
        /// File being replaced
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Moving the new link over the target failed.
    #[error("failed to rename link over {path}: {source}")]
    Rename {
        /// File being replaced
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// General I/O error while checking the files.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being checked
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::KeeperMissing(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::CrossDevice { target: p, .. }
            | Self::Reserve { path: p, .. }
            | Self::Link { path: p, .. }
            | Self::Rename { path: p, .. }
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

/// Configuration for hardlink replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Verify size and mtime of keeper and target before linking.
    pub verify_unchanged: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            verify_unchanged: true,
        }
    }
}

impl LinkConfig {
    /// Enable/disable TOCTOU verification.
    #[must_use]
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }
}

/// What [`replace_with_hardlink`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The target now shares the keeper's storage; `size` bytes reclaimed
    Linked {
        /// Bytes reclaimed
        size: u64,
    },
    /// The target already shared the keeper's storage
    AlreadyLinked,
}

/// Replace `target` with a hardlink to `keeper`.
///
/// # Errors
///
/// - `KeeperMissing` / `NotFound` if either file is gone
/// - `Modified` if verification is enabled and either file changed
/// - `CrossDevice` if the files are on different filesystems
/// - `Reserve`, `Link` or `Rename` if the corresponding step fails; the
///   target is unchanged in every case
pub fn replace_with_hardlink(
    keeper: &FileDescriptor,
    target: &FileDescriptor,
    config: &LinkConfig,
) -> Result<LinkOutcome, LinkError> {
    let keeper_path = keeper.action_path();
    let target_path = target.action_path();

    let keeper_meta = fs::metadata(keeper_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LinkError::KeeperMissing(keeper_path.to_path_buf()),
        _ => LinkError::from_io(keeper_path, e),
    })?;
    let target_meta =
        fs::symlink_metadata(target_path).map_err(|e| LinkError::from_io(target_path, e))?;

    let keeper_id = storage_id(&keeper_meta);
    if keeper_id.1 != 0 && keeper_id == storage_id(&target_meta) {
        log::debug!("Already linked: {}", target_path.display());
        return Ok(LinkOutcome::AlreadyLinked);
    }

    if config.verify_unchanged {
        if has_changed(keeper_path, keeper).map_err(|e| LinkError::from_io(keeper_path, e))? {
            return Err(LinkError::Modified(keeper_path.to_path_buf()));
        }
        if has_changed(target_path, target).map_err(|e| LinkError::from_io(target_path, e))? {
            return Err(LinkError::Modified(target_path.to_path_buf()));
        }
    }

    let dir = match target_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let reserve_error = |source: io::Error| LinkError::Reserve {
        path: target_path.to_path_buf(),
        source,
    };
    let placeholder = tempfile::Builder::new()
        .prefix(".dupefinder-link-")
        .tempfile_in(dir)
        .map_err(reserve_error)?
        .into_temp_path();
    let reserved = placeholder.to_path_buf();
    placeholder.close().map_err(reserve_error)?;

    if let Err(e) = fs::hard_link(keeper_path, &reserved) {
        return Err(if e.kind() == io::ErrorKind::CrossesDevices {
            LinkError::CrossDevice {
                keeper: keeper_path.to_path_buf(),
                target: target_path.to_path_buf(),
            }
        } else {
            LinkError::Link {
                path: target_path.to_path_buf(),
                source: e,
            }
        });
    }

    if let Err(e) = fs::rename(&reserved, target_path) {
        if let Err(cleanup) = fs::remove_file(&reserved) {
            log::warn!(
                "Could not remove temporary link {}: {}",
                reserved.display(),
                cleanup
            );
        }
        return Err(LinkError::Rename {
            path: target_path.to_path_buf(),
            source: e,
        });
    }

    log::info!(
        "Linked: {} -> {} ({} bytes)",
        target_path.display(),
        keeper_path.display(),
        target.size
    );
    Ok(LinkOutcome::Linked { size: target.size })
}

/// Replace every additional member of every group with a link to its keeper.
#[must_use]
pub fn link_duplicates(groups: &DuplicateMap, config: &LinkConfig) -> ActionReport {
    let mut report = ActionReport::new(ActionKind::Link);

    for group in groups.values() {
        let keeper = group.keeper();
        for member in group.additional() {
            match replace_with_hardlink(keeper, member, config) {
                Ok(LinkOutcome::Linked { size }) => {
                    report.record_success(member.action_path().to_path_buf(), size);
                }
                Ok(LinkOutcome::AlreadyLinked) => {
                    report.skipped.push(member.action_path().to_path_buf());
                }
                Err(e) => report.record_failure(e.path(), &e),
            }
        }
    }

    log::info!("{}", report.summary());
    report
}
