//! Directory enumeration using walkdir.
//!
//! # Overview
//!
//! The [`Walker`] visits every root recursively and yields one [`FileJob`] per
//! regular file, carrying the path and the `stat` metadata the hashing workers
//! need. It never follows symbolic links and never yields them: a link's
//! target may itself be deleted or relinked as a duplicate, so treating the
//! link as a copy of its target would be unsafe.
//!
//! # Error policy
//!
//! - An unreadable directory yields one error and its subtree is skipped.
//! - A file whose metadata cannot be read yields one error and is skipped.
//! - Either way the walk continues with the next entry.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::scanner::Walker;
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from("/home/user/Downloads")];
//! let walker = Walker::new(&roots);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(job) => println!("{}: {} bytes", job.path.display(), job.metadata.len()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::ScanError;

/// A regular file discovered by the walker, ready for hashing.
#[derive(Debug)]
pub struct FileJob {
    /// Path as reached from the root (root-relative if the root was relative)
    pub path: PathBuf,
    /// Metadata of the file itself (symlinks are not followed)
    pub metadata: Metadata,
}

/// Recursive enumerator over one or more root directories.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Roots to walk, in order
    roots: Vec<PathBuf>,
}

impl Walker {
    /// Create a walker over the given roots.
    #[must_use]
    pub fn new(roots: &[PathBuf]) -> Self {
        Self {
            roots: roots.to_vec(),
        }
    }

    /// Roots this walker visits.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Walk all roots, yielding regular files.
    ///
    /// Entries inside each directory are visited in file-name order, so the
    /// dispatch order is deterministic for an unchanged tree. Errors are
    /// yielded as [`ScanError`] values rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileJob, ScanError>> + '_ {
        self.roots.iter().flat_map(|root| Self::walk_root(root))
    }

    fn walk_root(root: &Path) -> impl Iterator<Item = Result<FileJob, ScanError>> + '_ {
        log::debug!("Walking {}", root.display());

        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }

                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }

                    if !file_type.is_file() {
                        log::trace!("Skipping special file: {}", entry.path().display());
                        return None;
                    }

                    match entry.metadata() {
                        Ok(metadata) => Some(Ok(FileJob {
                            path: entry.into_path(),
                            metadata,
                        })),
                        Err(e) => Some(Err(Self::handle_walk_error(root, e))),
                    }
                }
                Err(e) => Some(Err(Self::handle_walk_error(root, e))),
            })
    }

    /// Convert a walkdir error into a [`ScanError`] and log it.
    fn handle_walk_error(root: &Path, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        let path = error
            .path()
            .map_or_else(|| root.to_path_buf(), Path::to_path_buf);

        let Some(io_error) = error.into_io_error() else {
            log::warn!("Filesystem loop detected at {}", path.display());
            return ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            };
        };

        match io_error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            ErrorKind::NotFound => {
                log::debug!("Path not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), io_error);
                ScanError::Io {
                    path,
                    source: io_error,
                }
            }
        }
    }
}
