//! File descriptors: one record per scanned regular file.
//!
//! A descriptor is built once from a path and its metadata, optionally gets a
//! digest, and is then frozen behind an [`Arc`] in the scan's [`FileMap`].
//!
//! # Cache validity
//!
//! Two descriptors are *superficially identical* when their size and
//! modification time agree. That is the only test used to decide whether a
//! digest from a previous run can be reused; file content is NOT re-read on a
//! cache hit. A file rewritten with the same size inside the same second, or
//! whose mtime was restored, keeps its stale digest until either value changes.

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;

use super::hardlink::storage_id;
use super::hasher::{hash_file, DigestAlgorithm};
use super::HashError;

/// The authoritative set of known files, keyed by scan path.
pub type FileMap = HashMap<PathBuf, Arc<FileDescriptor>>;

/// Identity, metadata and digest of one regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Path used to scan the file (unique within a scan)
    pub key: PathBuf,
    /// Resolved absolute path, used when an action targets the real file
    pub absolute_path: PathBuf,
    /// File name component
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Modification time in seconds since the Unix epoch
    pub modified: i64,
    /// Lowercase hex content digest; empty means "not yet hashed"
    pub digest: String,
    /// Inode number, 0 when unknown
    pub inode: u64,
    /// Device id of the filesystem holding the inode, 0 when unknown
    pub device: u64,
}

impl FileDescriptor {
    /// Create an unhashed descriptor with unknown storage identity.
    ///
    /// The name is taken from the last path component and the absolute path
    /// is resolved against the current directory (without following symlinks).
    #[must_use]
    pub fn new(key: PathBuf, size: u64, modified: i64) -> Self {
        let name = key
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let absolute_path = std::path::absolute(&key).unwrap_or_else(|_| key.clone());
        Self {
            key,
            absolute_path,
            name,
            size,
            modified,
            digest: String::new(),
            inode: 0,
            device: 0,
        }
    }

    /// Build a descriptor from a path and the metadata returned by `stat`.
    #[must_use]
    pub fn from_metadata(key: PathBuf, metadata: &Metadata) -> Self {
        let modified = FileTime::from_last_modification_time(metadata).unix_seconds();
        let (device, inode) = storage_id(metadata);
        Self::new(key, metadata.len(), modified).with_storage_id(device, inode)
    }

    /// Set the `(device, inode)` identity.
    #[must_use]
    pub fn with_storage_id(mut self, device: u64, inode: u64) -> Self {
        self.device = device;
        self.inode = inode;
        self
    }

    /// Set the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = digest.into();
        self
    }

    /// `true` iff the key still resolves to a regular (non-directory) file.
    #[must_use]
    pub fn exists(&self) -> bool {
        fs::metadata(&self.key).is_ok_and(|m| !m.is_dir())
    }

    /// `true` iff a digest is present.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        !self.digest.is_empty()
    }

    /// Read the whole file and store its digest.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read. The
    /// descriptor's digest is left untouched in that case.
    pub fn compute_digest(&mut self, algorithm: DigestAlgorithm) -> Result<(), HashError> {
        let digest = hash_file(algorithm, &self.key)?;
        self.digest = digest;
        Ok(())
    }

    /// Fast cache-validity heuristic: equal size and modification time.
    ///
    /// Can report `true` for files whose content differs; callers accept that
    /// risk in exchange for not re-reading unchanged files.
    #[must_use]
    pub fn looks_identical(&self, other: &FileDescriptor) -> bool {
        !self.key.as_os_str().is_empty()
            && self.size == other.size
            && self.modified == other.modified
    }

    /// Copy the digest of a superficially identical earlier descriptor.
    pub fn inherit_digest(&mut self, previous: &FileDescriptor) {
        self.digest.clone_from(&previous.digest);
    }

    /// Path to use when acting on the real file: absolute when known.
    #[must_use]
    pub fn action_path(&self) -> &Path {
        if self.absolute_path.as_os_str().is_empty() {
            &self.key
        } else {
            &self.absolute_path
        }
    }

    /// `true` when both descriptors are known to share one storage object.
    #[must_use]
    pub fn same_storage(&self, other: &FileDescriptor) -> bool {
        self.inode != 0 && self.inode == other.inode && self.device == other.device
    }
}
