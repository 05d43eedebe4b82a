use crate::config::PROGRESS_INTERVAL;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Snapshot handed to the reporter after each page fragment.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub elapsed: Duration,
    /// Pages per second since the run started.
    pub throughput: u64,
    pub pages: u64,
    pub revisions: u64,
    pub title: &'a str,
}

impl ProgressUpdate<'_> {
    /// `HH:MM:SS | speed /s | pages | revisions | title`
    pub fn render(&self) -> String {
        format!(
            "{:>12} | {:>8} /s | {:>12} | {:>12} | {}",
            format_runtime(self.elapsed),
            self.throughput,
            self.pages,
            self.revisions,
            self.title
        )
    }
}

pub trait ProgressReporter {
    fn report(&mut self, update: &ProgressUpdate<'_>);

    fn finish(&mut self) {}
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _update: &ProgressUpdate<'_>) {}
}

/// Terminal spinner redrawn every [`PROGRESS_INTERVAL`] pages.
pub struct SpinnerProgress {
    pb: ProgressBar,
    interval: u64,
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner(), PROGRESS_INTERVAL)
    }

    pub fn with_bar(pb: ProgressBar, interval: u64) -> Self {
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Self {
            pb,
            interval: interval.max(1),
        }
    }
}

impl ProgressReporter for SpinnerProgress {
    fn report(&mut self, update: &ProgressUpdate<'_>) {
        if update.pages % self.interval == 0 {
            self.pb.set_message(update.render());
        }
    }

    fn finish(&mut self) {
        self.pb.finish_and_clear();
    }
}

/// Zero-padded `HH:MM:SS`; hours keep growing past 99.
pub fn format_runtime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Whole pages per second, zero before any time has elapsed.
pub fn throughput(pages: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0;
    }
    (pages as f64 / secs) as u64
}
