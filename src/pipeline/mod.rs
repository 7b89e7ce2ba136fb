// Oracle-backed pipelines: batch classification, identifier resolution and
// identifier validation.
//
// Both are sequential by contract. Calls go out one at a time through a
// Pacer owned by the run, so the rate limit holds no matter how the caller
// schedules runs. Cancellation is checked between units of work, never in
// the middle of one.

pub mod classify;
pub mod distribution;
pub mod resolve;
pub mod validate;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Duration;

use crate::oracle::RetryPolicy;

/// Knobs shared by oracle-backed runs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Records per classification call. Must be at least 1.
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Minimum gap between consecutive oracle calls.
    pub rate_limit_interval: Duration,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry: RetryPolicy::default(),
            rate_limit_interval: Duration::from_secs(1),
            show_progress: false,
        }
    }
}

fn progress_bar(len: usize, label: &str, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template(&format!("  {label} [{{bar:30}}] {{pos}}/{{len}} ({{eta}})"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
