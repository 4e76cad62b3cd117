//! Command-line interface definitions for dupefinder.
//!
//! # Example
//!
//! ```bash
//! # List duplicates under two trees
//! dupefinder ~/photos /mnt/backup/photos
//!
//! # Reuse hashes from the last run and save the updated map
//! dupefinder --map-file-import map.json --map-file-export map.json --map-file-replace ~/photos
//!
//! # Replace duplicates with hardlinks to the oldest copy
//! dupefinder --sort mtime --reverse --link --yes ~/photos
//!
//! # Write an md5sum-compatible file without walking the disk
//! dupefinder --no-scan --map-file-import map.json --export-hashsums MD5SUMS
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::duplicates::SortKey;
use crate::mapfile::MapFormat;
use crate::output::OutputFormat;
use crate::scanner::{DigestAlgorithm, VanishedPolicy};

/// Incremental duplicate file finder.
///
/// Hashes every regular file under the given directories, groups identical
/// content, and optionally deletes duplicates or replaces them with
/// hardlinks. A map file carries hashes between runs so unchanged files
/// (same size and modification time) are not read again.
#[derive(Debug, Parser)]
#[command(name = "dupefinder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan
    #[arg(value_name = "DIR", required_unless_present = "no_scan")]
    pub roots: Vec<PathBuf>,

    /// Seed the file set from a map file written by an earlier run
    #[arg(long, value_name = "FILE")]
    pub map_file_import: Option<PathBuf>,

    /// Write the file set to a map file after the scan
    #[arg(long, value_name = "FILE")]
    pub map_file_export: Option<PathBuf>,

    /// Allow the export to overwrite an existing file
    #[arg(long)]
    pub map_file_replace: bool,

    /// Layout of the exported map file
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub map_format: Option<MapFormat>,

    /// Write `<digest>  <path>` lines for every file (`-` for stdout)
    #[arg(long, value_name = "FILE")]
    pub export_hashsums: Option<PathBuf>,

    /// Trust the imported map as-is and skip the directory walk
    #[arg(long, requires = "map_file_import")]
    pub no_scan: bool,

    /// Key that orders each group; the first file is kept
    #[arg(long, value_enum, value_name = "KEY")]
    pub sort: Option<SortKey>,

    /// Reverse the group ordering
    #[arg(long, overrides_with = "no_reverse")]
    pub reverse: bool,

    /// Keep the normal group ordering even if the config file reverses it
    #[arg(long, overrides_with = "reverse")]
    pub no_reverse: bool,

    /// Report absolute paths instead of scan paths
    #[arg(long, overrides_with = "no_absolute")]
    pub absolute: bool,

    /// Report scan paths even if the config file asks for absolute paths
    #[arg(long, overrides_with = "absolute")]
    pub no_absolute: bool,

    /// Do not warn about files that vanish between the walk and hashing
    #[arg(long, conflicts_with = "fatal_vanished")]
    pub ignore_vanished: bool,

    /// Abort before any output or action if a file vanishes during the scan
    #[arg(long)]
    pub fatal_vanished: bool,

    /// Number of hashing workers
    #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Digest algorithm
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub algorithm: Option<DigestAlgorithm>,

    /// Delete every additional file of each group
    #[arg(long, conflicts_with = "link")]
    pub delete: bool,

    /// Replace every additional file with a hardlink to the keeper
    #[arg(long)]
    pub link: bool,

    /// Move deleted files to the system trash instead of unlinking them
    #[arg(long, requires = "delete")]
    pub trash: bool,

    /// Confirm a destructive action
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Do not list duplicate groups
    #[arg(long)]
    pub no_groups: bool,

    /// Do not print the summary
    #[arg(long)]
    pub no_summary: bool,

    /// Format of the listing and summary
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

impl Cli {
    /// Explicit `--reverse` / `--no-reverse`, if given.
    #[must_use]
    pub fn reverse_flag(&self) -> Option<bool> {
        switch(self.reverse, self.no_reverse)
    }

    /// Explicit `--absolute` / `--no-absolute`, if given.
    #[must_use]
    pub fn absolute_flag(&self) -> Option<bool> {
        switch(self.absolute, self.no_absolute)
    }

    /// Vanished-file policy requested on the command line, if any.
    #[must_use]
    pub fn vanished_policy(&self) -> Option<VanishedPolicy> {
        if self.fatal_vanished {
            Some(VanishedPolicy::Fatal)
        } else if self.ignore_vanished {
            Some(VanishedPolicy::Ignore)
        } else {
            None
        }
    }

    /// Name of the requested destructive action, if any.
    #[must_use]
    pub fn action_name(&self) -> Option<&'static str> {
        if self.delete {
            Some("delete")
        } else if self.link {
            Some("link")
        } else {
            None
        }
    }
}

fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
