//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-01-01T12:00:00Z",
//!   "algorithm": "md5",
//!   "duplicates": [
//!     {
//!       "digest": "9dd4e461268c8034f5c8564e155c67a6",
//!       "size": 1,
//!       "keeper": "a.txt",
//!       "duplicates": ["b.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "total_size": 3,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "duplicate_size": 1,
//!     "hashed": 3,
//!     "reused": 0,
//!     "failed": 0,
//!     "scan_duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "DF000"
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::display_path;
use crate::actions::ActionReport;
use crate::duplicates::{DuplicateGroup, DuplicateMap, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::{DigestAlgorithm, ScanReport};

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content digest (lowercase hex)
    pub digest: String,
    /// Size of one copy in bytes
    pub size: u64,
    /// The file that is kept
    pub keeper: String,
    /// The additional files
    pub duplicates: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup, absolute: bool) -> Self {
        Self {
            digest: group.digest().to_string(),
            size: group.size(),
            keeper: display_path(group.keeper(), absolute).into_owned(),
            duplicates: group
                .additional()
                .iter()
                .map(|f| display_path(f, absolute).into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of known files
    pub total_files: usize,
    /// Total size of all known files in bytes
    pub total_size: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of additional (non-keeper) files
    pub duplicate_files: usize,
    /// Reclaimable bytes
    pub duplicate_size: u64,
    /// Files hashed during this run
    pub hashed: u64,
    /// Files whose digest was reused from the imported map
    pub reused: u64,
    /// Files that could not be hashed
    pub failed: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DF000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanSummary`] and an exit code.
    ///
    /// Scan statistics stay zero until a report is attached.
    #[must_use]
    pub fn new(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            duplicate_size: summary.duplicate_size,
            hashed: 0,
            reused: 0,
            failed: 0,
            scan_duration_ms: 0,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Result of a destructive action in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonActionReport {
    /// Paths acted on
    pub succeeded: Vec<String>,
    /// Paths already in the desired state
    pub skipped: Vec<String>,
    /// Failed paths with their error messages
    pub failed: Vec<JsonFailure>,
    /// Bytes reclaimed
    pub bytes_reclaimed: u64,
}

/// One failed action.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    /// Path of the file
    pub path: String,
    /// Error message
    pub error: String,
}

impl From<&ActionReport> for JsonActionReport {
    fn from(report: &ActionReport) -> Self {
        Self {
            succeeded: report
                .successes
                .iter()
                .map(|s| s.path.to_string_lossy().into_owned())
                .collect(),
            skipped: report
                .skipped
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            failed: report
                .failures
                .iter()
                .map(|(path, error)| JsonFailure {
                    path: path.to_string_lossy().into_owned(),
                    error: error.clone(),
                })
                .collect(),
            bytes_reclaimed: report.bytes_reclaimed,
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the output was produced
    pub generated_at: DateTime<Utc>,
    /// Digest algorithm of every `digest` value
    pub algorithm: DigestAlgorithm,
    /// List of duplicate groups, in digest order
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// Outcome of the destructive action, if one ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<JsonActionReport>,
}

impl JsonOutput {
    /// Create a new JSON output; `absolute` selects absolute paths.
    ///
    /// # Example
    ///
    /// ```
    /// use dupefinder::duplicates::{DuplicateMap, ScanSummary};
    /// use dupefinder::error::ExitCode;
    /// use dupefinder::output::json::JsonOutput;
    /// use dupefinder::scanner::DigestAlgorithm;
    ///
    /// let output = JsonOutput::new(
    ///     &DuplicateMap::new(),
    ///     &ScanSummary::default(),
    ///     DigestAlgorithm::Md5,
    ///     false,
    ///     ExitCode::Success,
    /// );
    /// assert!(output.duplicates.is_empty());
    /// ```
    #[must_use]
    pub fn new(
        groups: &DuplicateMap,
        summary: &ScanSummary,
        algorithm: DigestAlgorithm,
        absolute: bool,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            algorithm,
            duplicates: groups
                .values()
                .map(|g| JsonDuplicateGroup::from_duplicate_group(g, absolute))
                .collect(),
            summary: JsonSummary::new(summary, exit_code),
            action: None,
        }
    }

    /// Include hashing statistics from a scan run.
    #[must_use]
    pub fn with_scan_report(mut self, report: &ScanReport) -> Self {
        self.summary.hashed = report.hashed;
        self.summary.reused = report.reused;
        self.summary.failed = report.failed();
        self.summary.scan_duration_ms =
            u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Attach the outcome of a destructive action.
    #[must_use]
    pub fn with_action(mut self, report: &ActionReport) -> Self {
        self.action = Some(JsonActionReport::from(report));
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
