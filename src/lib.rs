//! dupefinder - incremental duplicate file finder
//!
//! Finds duplicate files under one or more directory trees by content digest,
//! reuses digests from a previous run for files whose size and modification
//! time are unchanged, and can delete duplicates or replace them with
//! hardlinks.
//!
//! The pipeline is: [`mapfile`] optionally seeds a [`scanner::Scan`], the scan
//! walks the roots and updates its file set, the [`duplicates`] classifier
//! derives groups from the grouping index, and [`actions`] / [`output`]
//! consume the groups.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod mapfile;
pub mod output;
pub mod progress;
pub mod scanner;

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::actions::{delete_duplicates, link_duplicates, ActionReport, DeleteConfig, LinkConfig};
use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{classify, DuplicateMap, ScanSummary, SortOrder};
use crate::error::{ExitCode, SetupError};
use crate::mapfile::{export_hashsums, export_map, import_map, MapFormat};
use crate::output::{JsonOutput, OutputFormat, TextOutput};
use crate::progress::Progress;
use crate::scanner::{FileMap, Scan, ScanConfig, ScanReport};

/// Effective settings after layering config file, environment and flags.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Engine configuration
    pub scan: ScanConfig,
    /// Report absolute paths
    pub absolute: bool,
    /// Layout of exported map files
    pub map_format: MapFormat,
}

impl Settings {
    /// Apply CLI flags on top of the loaded configuration.
    #[must_use]
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        let order = SortOrder::new(
            cli.sort.unwrap_or(config.sort),
            cli.reverse_flag().unwrap_or(config.reverse),
        );
        let scan = ScanConfig::default()
            .with_workers(cli.workers.map_or(config.workers, usize::from))
            .with_algorithm(cli.algorithm.unwrap_or(config.algorithm))
            .with_sort(order.key)
            .with_reverse(order.reverse)
            .with_vanished(cli.vanished_policy().unwrap_or(config.vanished));
        Self {
            scan,
            absolute: cli.absolute_flag().unwrap_or(config.absolute_paths),
            map_format: cli.map_format.unwrap_or(config.map_format),
        }
    }
}

/// Check everything that must hold before the engine starts.
///
/// Returns the map file to export to, if any. `--map-file-replace` without
/// `--map-file-export` writes back to the imported map.
///
/// # Errors
///
/// Returns the first [`SetupError`] found.
pub fn validate(cli: &Cli) -> Result<Option<PathBuf>, SetupError> {
    for root in &cli.roots {
        let metadata = fs::metadata(root).map_err(|_| SetupError::PathNotFound(root.clone()))?;
        if !metadata.is_dir() {
            return Err(SetupError::NotADirectory(root.clone()));
        }
    }

    if let Some(import) = &cli.map_file_import {
        if !import.is_file() {
            return Err(SetupError::MapFileMissing(import.clone()));
        }
    }

    let export = match (&cli.map_file_export, cli.map_file_replace) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(
            cli.map_file_import
                .clone()
                .ok_or(SetupError::NothingToReplace)?,
        ),
        (None, false) => None,
    };
    if let Some(path) = &export {
        if !cli.map_file_replace && path.exists() {
            return Err(SetupError::MapFileConflict(path.clone()));
        }
    }

    if let Some(action) = cli.action_name() {
        if !cli.yes {
            return Err(SetupError::ConfirmationRequired(action));
        }
    }

    Ok(export)
}

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Setup problems surface as [`SetupError`] inside the returned error; map
/// file and output failures as general errors, as does a vanished file
/// under `--fatal-vanished`. Other per-file walk, hash and action failures
/// are logged and never end up here.
///
/// The map file and hash sums are written after any action, so they reflect
/// deleted and relinked files.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?;
    let settings = Settings::resolve(&cli, &config);
    let export_target = validate(&cli)?;
    let algorithm = settings.scan.algorithm();
    log::debug!("Effective settings: {:?}", settings);

    let files = match &cli.map_file_import {
        Some(path) => import_map(path, algorithm)
            .with_context(|| format!("Error importing map {}", path.display()))?,
        None => FileMap::new(),
    };

    let mut scan = Scan::with_files(settings.scan, files);
    let report = if cli.no_scan {
        log::info!("Skipping the walk; using {} imported file(s)", scan.len());
        None
    } else {
        for root in &cli.roots {
            scan.add_root(root);
        }
        let hide_progress = cli.quiet || !io::stderr().is_terminal();
        scan = scan.with_progress(Arc::new(Progress::new(hide_progress)));
        Some(scan.run_checked().context("Scan aborted")?)
    };

    let hashsums_to_stdout = cli.export_hashsums.as_deref() == Some(Path::new("-"));

    let groups = classify(scan.index());
    let summary = ScanSummary::new(scan.files(), &groups);

    let mut stdout = io::stdout().lock();
    let action = match cli.output {
        OutputFormat::Text => {
            if !hashsums_to_stdout {
                let mut text = TextOutput::new(&groups, &summary)
                    .with_absolute_paths(settings.absolute)
                    .with_groups(!cli.no_groups)
                    .with_summary(!cli.no_summary);
                if let Some(report) = &report {
                    text = text.with_scan_report(report);
                }
                text.write_to(&mut stdout)
                    .context("Error writing the duplicate listing")?;
            }
            let action = run_action(&cli, &groups);
            if let Some(action) = &action {
                write_action_summary(action, hashsums_to_stdout, &mut stdout, &mut io::stderr())
                    .context("Error writing the action summary")?;
            }
            action
        }
        OutputFormat::Json => {
            let action = run_action(&cli, &groups);
            let mut json = JsonOutput::new(
                &groups,
                &summary,
                algorithm,
                settings.absolute,
                ExitCode::Success,
            );
            if let Some(report) = &report {
                json = json.with_scan_report(report);
            }
            if let Some(action) = &action {
                json = json.with_action(action);
            }
            json.write_to(&mut stdout, true)
                .context("Error writing JSON output")?;
            action
        }
    };
    drop(stdout);

    if let Some(action) = &action {
        let touched: Vec<PathBuf> = action.successes.iter().map(|s| s.path.clone()).collect();
        scan.refresh_after_action(&touched);
    }

    if let Some(path) = &export_target {
        export_map(
            path,
            scan.files(),
            settings.map_format,
            algorithm,
            cli.map_file_replace,
        )
        .with_context(|| format!("Error exporting map {}", path.display()))?;
    }

    if let Some(dest) = &cli.export_hashsums {
        export_hashsums(dest, scan.files(), settings.absolute)
            .with_context(|| format!("Error exporting hash sums to {}", dest.display()))?;
    }

    log_scan_problems(report.as_ref());
    Ok(ExitCode::Success)
}

/// Apply the requested destructive action, if any.
fn run_action(cli: &Cli, groups: &DuplicateMap) -> Option<ActionReport> {
    if cli.delete {
        let config = if cli.trash {
            DeleteConfig::trash()
        } else {
            DeleteConfig::permanent()
        };
        Some(delete_duplicates(groups, &config))
    } else if cli.link {
        Some(link_duplicates(groups, &LinkConfig::default()))
    } else {
        None
    }
}

/// Print the one-line action summary.
///
/// Goes to `err` when hash sums are streamed to stdout, so that stream stays
/// a clean checksum list.
fn write_action_summary<O: Write, E: Write>(
    action: &ActionReport,
    hashsums_to_stdout: bool,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    if hashsums_to_stdout {
        writeln!(err, "{}", action.summary())
    } else {
        writeln!(out, "{}", action.summary())
    }
}

fn log_scan_problems(report: Option<&ScanReport>) {
    let Some(report) = report else { return };
    if !report.vanished.is_empty() {
        log::debug!("{} file(s) vanished during the scan", report.vanished.len());
    }
    if report.failed() > 0 || report.walk_errors > 0 {
        log::warn!(
            "{} file(s) could not be hashed and {} path(s) could not be read",
            report.failed(),
            report.walk_errors
        );
    }
}
