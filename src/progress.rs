//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ScanProgress`] callback trait that the scan
//! engine drives, and the [`Progress`] struct which implements it with a
//! terminal progress bar.
//!
//! The total number of files is unknown while the directory walk is running,
//! so the bar starts as a spinner and switches to a bounded bar once the
//! enumerator announces how many files it dispatched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress callback for the scan pipeline.
///
/// Implement this trait to receive progress updates during a scan. The
/// enumerator calls [`on_file_dispatched`](Self::on_file_dispatched) and
/// [`on_walk_finished`](Self::on_walk_finished); the collector calls
/// [`on_file_completed`](Self::on_file_completed) once per dispatched file,
/// whether it was hashed, reused from cache or failed.
pub trait ScanProgress: Send + Sync {
    /// Called when the enumerator hands a file to the worker pool.
    fn on_file_dispatched(&self, _path: &str) {}

    /// Called when the collector receives the outcome for one file.
    ///
    /// # Arguments
    ///
    /// * `completed` - Number of outcomes received so far (1-based)
    /// * `path` - Path of the completed file
    fn on_file_completed(&self, completed: u64, path: &str);

    /// Called once when the enumerator has dispatched every file.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of dispatched files
    fn on_walk_finished(&self, total: u64);

    /// Called once after the results have been merged into the file set.
    fn on_scan_finished(&self) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: ProgressBar,
    dispatched: AtomicU64,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupefinder::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert!(progress.is_quiet());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.set_style(Self::walking_style());
            bar.set_message("Scanning");
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };

        Self {
            bar,
            dispatched: AtomicU64::new(0),
            quiet,
        }
    }

    /// Check if the reporter is silenced.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Number of dispatch notifications seen so far.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Style while the walk is still running (spinner).
    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    /// Style once the total is known (bounded bar).
    fn hashing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ScanProgress for Progress {
    fn on_file_dispatched(&self, _path: &str) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    fn on_file_completed(&self, completed: u64, path: &str) {
        if self.quiet {
            return;
        }
        self.bar.set_position(completed);
        self.bar.set_message(truncate_path(path, 30));
    }

    fn on_walk_finished(&self, total: u64) {
        if self.quiet {
            return;
        }
        self.bar.set_length(total);
        self.bar.set_style(Self::hashing_style());
    }

    fn on_scan_finished(&self) {
        if self.quiet {
            return;
        }
        self.bar.finish_and_clear();
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
