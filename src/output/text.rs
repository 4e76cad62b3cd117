//! Plain-text listing of duplicate groups and the run summary.
//!
//! ```text
//! [d41d8cd98f00b204e9800998ecf8427e]
//! * photos/a.jpg
//! - backup/a.jpg
//!
//! Files:                  3
//! Total size:             3 B (3 B)
//! Duplicate groups:       1
//! Size of duplicates:     1 B (1 B)
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;

use super::display_path;
use crate::duplicates::{DuplicateMap, ScanSummary};
use crate::scanner::ScanReport;

/// Text formatter over classified groups.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    groups: &'a DuplicateMap,
    summary: &'a ScanSummary,
    report: Option<&'a ScanReport>,
    absolute: bool,
    show_groups: bool,
    show_summary: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter listing groups and summary with scan paths.
    #[must_use]
    pub fn new(groups: &'a DuplicateMap, summary: &'a ScanSummary) -> Self {
        Self {
            groups,
            summary,
            report: None,
            absolute: false,
            show_groups: true,
            show_summary: true,
        }
    }

    /// Include hashing statistics from a scan run.
    #[must_use]
    pub fn with_scan_report(mut self, report: &'a ScanReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Show absolute paths instead of scan paths.
    #[must_use]
    pub fn with_absolute_paths(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    /// Enable/disable the group listing.
    #[must_use]
    pub fn with_groups(mut self, show: bool) -> Self {
        self.show_groups = show;
        self
    }

    /// Enable/disable the summary block.
    #[must_use]
    pub fn with_summary(mut self, show: bool) -> Self {
        self.show_summary = show;
        self
    }

    /// Write the listing and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.show_groups {
            self.write_groups(writer)?;
        }
        if self.show_summary {
            self.write_summary(writer)?;
        }
        writer.flush()
    }

    fn write_groups<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in self.groups.values() {
            writeln!(writer, "[{}]", group.digest())?;
            writeln!(writer, "* {}", display_path(group.keeper(), self.absolute))?;
            for file in group.additional() {
                writeln!(writer, "- {}", display_path(file, self.absolute))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = self.summary;
        writeln!(writer, "Files:\t\t\t{}", s.total_files)?;
        writeln!(
            writer,
            "Total size:\t\t{} ({} B)",
            ByteSize::b(s.total_size),
            s.total_size
        )?;
        writeln!(writer, "Duplicate groups:\t{}", s.duplicate_groups)?;
        writeln!(
            writer,
            "Size of duplicates:\t{} ({} B)",
            ByteSize::b(s.duplicate_size),
            s.duplicate_size
        )?;
        if let Some(report) = self.report {
            writeln!(writer, "Hashed:\t\t\t{}", report.hashed)?;
            writeln!(writer, "Reused from map:\t{}", report.reused)?;
            if report.failed() > 0 || report.walk_errors > 0 {
                writeln!(
                    writer,
                    "Skipped (errors):\t{}",
                    report.failed() + report.walk_errors
                )?;
            }
            if !report.vanished.is_empty() {
                writeln!(writer, "Vanished:\t\t{}", report.vanished.len())?;
            }
        }
        writeln!(writer)
    }
}
