//! Structured error handling and exit codes.

use std::path::PathBuf;

use serde::Serialize;

/// Exit codes for the dupefinder application.
///
/// - 0: Success (run completed; per-file action failures do not change this)
/// - 1: General error (fatal import/export or unexpected failure)
/// - 2: Setup error (bad roots, map-file conflict, missing confirmation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed.
    Success = 0,
    /// General error: a fatal error stopped the run.
    GeneralError = 1,
    /// Setup error: the run was rejected before scanning.
    SetupError = 2,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DF000",
            Self::GeneralError => "DF001",
            Self::SetupError => "DF002",
        }
    }

    /// Exit code for an error returned by the application.
    ///
    /// Errors whose chain contains a [`SetupError`] map to
    /// [`ExitCode::SetupError`]; everything else is a general error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if err.chain().any(|cause| cause.is::<SetupError>()) {
            Self::SetupError
        } else {
            Self::GeneralError
        }
    }
}

/// Problems detected before the scan engine is started.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    /// A root path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// A root path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The map file to import does not exist.
    #[error("Map file not found: {0}")]
    MapFileMissing(PathBuf),

    /// The export target exists and replacing it was not requested.
    #[error("Map file already exists: {0} (use --map-file-replace to overwrite)")]
    MapFileConflict(PathBuf),

    /// `--map-file-replace` was given without anything to replace.
    #[error("--map-file-replace needs --map-file-import or --map-file-export")]
    NothingToReplace,

    /// A destructive action was requested without confirmation.
    #[error("--{0} modifies files; pass --yes to confirm")]
    ConfirmationRequired(&'static str),

    /// The configuration file could not be loaded.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DF001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
