//! Streaming content digests.
//!
//! # Overview
//! A scan uses exactly one [`DigestAlgorithm`]. Files are streamed through
//! the hasher in fixed-size chunks, so memory use does not depend on file size,
//! and the file handle is closed before the caller moves on.
//!
//! MD5 is the default because hash-sums exports are meant to be checked with
//! `md5sum -c`. SHA-256 and BLAKE3 are available when collision resistance
//! matters more than interoperability.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use super::HashError;

/// Read buffer size for streaming hashes (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Content digest algorithm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5 (128-bit, md5sum compatible)
    #[default]
    Md5,
    /// SHA-256 (256-bit)
    Sha256,
    /// BLAKE3 (256-bit)
    Blake3,
}

impl DigestAlgorithm {
    /// Lowercase name, as written to map files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Parse an algorithm name, ignoring case and dashes (`SHA-256` == `sha256`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "md5" => Some(Self::Md5),
            "sha256" => Some(Self::Sha256),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }

    /// Field name older map files used to store this algorithm's digest.
    #[must_use]
    pub fn legacy_field(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA256",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Length of the hex digest in characters.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 | Self::Blake3 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum StreamingHasher {
    Md5(md5::Md5),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamingHasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(md5::Md5::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Md5(h) => h.update(chunk),
            Self::Sha256(h) => h.update(chunk),
            Self::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Stream everything `reader` yields through `algorithm` and return the hex digest.
///
/// # Errors
///
/// Propagates any read error; interrupted reads are retried.
pub fn hash_reader<R: Read>(algorithm: DigestAlgorithm, reader: &mut R) -> io::Result<String> {
    let mut hasher = StreamingHasher::new(algorithm);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize_hex())
}

/// Hash the full content of the file at `path`.
///
/// # Errors
///
/// Returns [`HashError`] if the file cannot be opened or read to the end.
pub fn hash_file(algorithm: DigestAlgorithm, path: &Path) -> Result<String, HashError> {
    let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    hash_reader(algorithm, &mut file).map_err(|e| HashError::from_io(path, e))
}

/// Hash an in-memory buffer.
#[must_use]
pub fn hash_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    let mut hasher = StreamingHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}
