//! Output formatters for duplicate scan results.
//!
//! This module provides two output formats for scan results:
//! - Text, in the `[digest]` / `* keeper` / `- duplicate` listing style
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::duplicates::{classify, ScanSummary};
//! use dupefinder::output::text::TextOutput;
//! use dupefinder::scanner::{Scan, ScanConfig};
//!
//! let mut scan = Scan::new(ScanConfig::default());
//! scan.add_root(".");
//! scan.run();
//! let groups = classify(scan.index());
//! let summary = ScanSummary::new(scan.files(), &groups);
//!
//! let output = TextOutput::new(&groups, &summary);
//! output.write_to(&mut std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::scanner::FileDescriptor;

// Re-export main types
pub use json::JsonOutput;
pub use text::TextOutput;

/// Output format for the listing and summary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// Path to show for a descriptor: absolute when requested and known.
#[must_use]
pub fn display_path(desc: &FileDescriptor, absolute: bool) -> Cow<'_, str> {
    if absolute && !desc.absolute_path.as_os_str().is_empty() {
        desc.absolute_path.to_string_lossy()
    } else {
        desc.key.to_string_lossy()
    }
}
