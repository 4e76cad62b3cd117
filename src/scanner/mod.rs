//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - File descriptors with cache-validity checks
//! - Directory enumeration using walkdir
//! - Content digests (MD5, SHA-256 or BLAKE3, one active per run)
//! - Inode extraction for hardlink awareness
//! - The incremental scan engine that ties them together
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`descriptor`]: One record per scanned regular file
//! - [`hasher`]: Streaming digest computation
//! - [`hardlink`]: Platform storage identity (device, inode)
//! - [`walker`]: Directory traversal and file discovery
//! - [`engine`]: Worker pool, termination handshake and cache reuse
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::scanner::{Scan, ScanConfig};
//!
//! let mut scan = Scan::new(ScanConfig::default().with_workers(4));
//! scan.add_root("./photos");
//! let report = scan.run();
//! println!(
//!     "{} files ({} hashed, {} reused)",
//!     scan.len(),
//!     report.hashed,
//!     report.reused
//! );
//! ```

pub mod descriptor;
pub mod engine;
pub mod hardlink;
pub mod hasher;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use descriptor::{FileDescriptor, FileMap};
pub use engine::{HashFailure, Scan, ScanConfig, ScanHandle, ScanReport, VanishedPolicy};
pub use hasher::{hash_bytes, hash_file, DigestAlgorithm};
pub use walker::{FileJob, Walker};

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A file disappeared between the walk and hashing.
    #[error("File vanished before it could be hashed: {0}")]
    Vanished(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while opening or reading `path`.
    pub(crate) fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
