use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Completion fraction clamped to [0, 1]; an empty job counts as done.
pub fn fraction(progress: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (progress as f64 / total as f64).clamp(0.0, 1.0)
}

/// `HH:MM:SS` rendering for remaining-time estimates.
pub fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Rough remaining-time estimate from a running average of per-item wall
/// times, seeded with a prior so the first estimate is not garbage.
pub struct Eta {
    samples: Vec<Duration>,
}

impl Eta {
    pub fn new(prior: Duration) -> Self {
        Self { samples: vec![prior] }
    }

    /// Record the wall time of one completed item.
    pub fn record(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    /// Average time per item over everything seen so far.
    pub fn per_item(&self) -> Duration {
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    /// Estimated time remaining for `items_left` more items.
    pub fn remaining(&self, items_left: u64) -> Duration {
        self.per_item() * items_left.min(u32::MAX as u64) as u32
    }
}

/// Bar for a whole run of links: fixed-width bar, percentage, postfix.
pub(crate) fn run_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("[{bar:50}] {percent:>3}% {msg}")
            .expect("valid progress template")
            .progress_chars("##_"),
    );
    bar
}

/// Bar for the bytes of a single download.
pub(crate) fn byte_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("[{bar:50}] {percent:>3}% {bytes}/{total_bytes}")
            .expect("valid progress template")
            .progress_chars("##_"),
    );
    bar
}
