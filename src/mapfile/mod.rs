//! Map files: the persisted file set, plus md5sums-style exports.
//!
//! # Overview
//!
//! A map file stores every known [`FileDescriptor`](crate::scanner::FileDescriptor)
//! as JSON so that a later run can reuse digests of unchanged files. Two
//! shapes are accepted on import and can be written on export:
//!
//! - **object**: `{ "<path>": { "Path": ..., "Size": ..., ... }, ... }`
//! - **array**: `[ { "Path": ..., "Size": ..., ... }, ... ]`
//!
//! The importer looks at the first non-whitespace byte to tell them apart and
//! decodes both into the same [`FileMap`](crate::scanner::FileMap). An import
//! either succeeds completely or returns an error; callers never see a
//! partially decoded set. Exports are written to a temporary file next to the
//! destination and renamed into place.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::mapfile::{export_map, import_map, MapFormat};
//! use dupefinder::scanner::DigestAlgorithm;
//! use std::path::Path;
//!
//! let files = import_map(Path::new("old.json"), DigestAlgorithm::Md5)?;
//! export_map(Path::new("new.json"), &files, MapFormat::Array, DigestAlgorithm::Md5, false)?;
//! # Ok::<(), dupefinder::mapfile::MapFileError>(())
//! ```

mod io;
mod record;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use io::{decode_map, encode_map, export_hashsums, export_map, import_map, render_hashsums};

/// On-disk shape of a map file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MapFormat {
    /// Object keyed by path
    #[default]
    Object,
    /// Flat array of records
    Array,
}

/// Errors raised while importing or exporting map and hash-sums files.
#[derive(thiserror::Error, Debug)]
pub enum MapFileError {
    /// The map file could not be read.
    #[error("Failed to read map file {path}: {source}")]
    Read {
        /// Map file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The destination could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The map file is not valid JSON.
    #[error("Malformed map file {path}: {source}")]
    Parse {
        /// Map file path
        path: PathBuf,
        /// The JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The top-level value is neither an object nor an array.
    #[error("Unrecognized map file {path}: expected '{{' or '[' but found {}", describe(.found))]
    UnknownShape {
        /// Map file path
        path: PathBuf,
        /// First non-whitespace character, if any
        found: Option<char>,
    },

    /// A record is missing a required field or has a field of the wrong type.
    #[error("Invalid record {record} in {path}: {reason}")]
    InvalidRecord {
        /// Map file path
        path: PathBuf,
        /// Record key, or `#index` for array records without a usable path
        record: String,
        /// What is wrong with it
        reason: String,
    },

    /// The destination exists and replacing it was not requested.
    #[error("Refusing to overwrite existing file: {0}")]
    AlreadyExists(PathBuf),

    /// A descriptor has no digest, so no hash-sums line can be written.
    #[error("File has not been hashed: {0}")]
    Unhashed(PathBuf),

    /// A descriptor has no usable path for the requested path style.
    #[error("File has no path: {0}")]
    MissingPath(String),

    /// The file set could not be serialized.
    #[error("Failed to serialize map: {0}")]
    Serialize(#[source] serde_json::Error),
}

fn describe(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{}'", c),
        None => "an empty file".to_string(),
    }
}
