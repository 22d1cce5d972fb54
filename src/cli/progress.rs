//! Progress display for sync runs
//!
//! Renders one indicatif bar that advances as outcomes arrive from the fetch
//! executor. When stderr is not a terminal, or bars are disabled, progress is
//! logged at info level in ten percent steps instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! use blob_fetcher::cli::{ProgressConfig, ProgressDisplay};
//!
//! let display = ProgressDisplay::new(ProgressConfig {
//!     enable_progress_bars: true,
//!     ..Default::default()
//! });
//! // Pass `&mut display` as the observer of `Orchestrator::sync`
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::app::{FetchOutcome, RunSummary, SyncObserver};

/// Configuration for the progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Draw a progress bar (only honoured on a terminal)
    pub enable_progress_bars: bool,
    /// Longest file name shown next to the bar
    pub max_filename_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            max_filename_width: 40,
        }
    }
}

/// Progress display driven by fetch outcomes
#[derive(Debug)]
pub struct ProgressDisplay {
    config: ProgressConfig,
    bar: Option<ProgressBar>,
    is_terminal: bool,
    total: usize,
    completed: usize,
    failed: usize,
    last_logged_step: usize,
}

impl ProgressDisplay {
    /// Create a new progress display with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);

        Self {
            config,
            bar: None,
            is_terminal,
            total: 0,
            completed: 0,
            failed: 0,
            last_logged_step: 0,
        }
    }

    fn bars_enabled(&self) -> bool {
        self.config.enable_progress_bars && self.is_terminal
    }

    fn create_bar(total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            Ok(style) => bar.set_style(style.progress_chars("##-")),
            Err(e) => debug!("Progress bar template error: {}", e),
        }
        bar
    }

    /// Files finished so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Failures seen so far
    pub fn failed(&self) -> usize {
        self.failed
    }

    fn log_text_progress(&mut self) {
        if self.total == 0 {
            return;
        }

        let step = self.completed * 10 / self.total;
        if step > self.last_logged_step {
            self.last_logged_step = step;
            info!(
                "Progress: {}/{} files ({} failed)",
                self.completed, self.total, self.failed
            );
        }
    }
}

impl SyncObserver for ProgressDisplay {
    fn on_start(&mut self, total: usize) {
        self.total = total;
        self.completed = 0;
        self.failed = 0;
        self.last_logged_step = 0;

        if self.bars_enabled() && total > 0 {
            self.bar = Some(Self::create_bar(total));
        }

        debug!("Progress display started for {} files", total);
    }

    fn on_outcome(&mut self, outcome: &FetchOutcome) {
        self.completed += 1;
        if outcome.is_failure() {
            self.failed += 1;
        }

        match &self.bar {
            Some(bar) => {
                bar.set_message(truncate_name(
                    outcome.object().file_name(),
                    self.config.max_filename_width,
                ));
                bar.inc(1);
            }
            None => self.log_text_progress(),
        }
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{} failed", summary.failure_count()));
        }
    }
}

/// Shorten a file name to `width` characters, keeping the end
fn truncate_name(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width || width < 4 {
        return name.to_string();
    }

    let tail: String = name.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}
