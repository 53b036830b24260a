use crate::core::batch::ItemStatus;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Callback notified as a batch advances through its datasets.
pub trait ProgressObserver: Send + Sync {
    fn on_start(&self, _total: usize) {}

    fn on_item(&self, ordinal: usize, total: usize, status: ItemStatus);

    fn on_finish(&self, _total: usize) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    #[default]
    Bar,
    Log,
    None,
}

impl ProgressStyle {
    pub fn observer(&self) -> Box<dyn ProgressObserver> {
        match self {
            ProgressStyle::Bar => Box::new(TextProgressBar::new("Processing datasets")),
            ProgressStyle::Log => Box::new(LogProgress),
            ProgressStyle::None => Box::new(NoProgress),
        }
    }
}

pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_item(&self, _ordinal: usize, _total: usize, _status: ItemStatus) {}
}

pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_start(&self, total: usize) {
        tracing::info!("Processing {} datasets", total);
    }

    fn on_item(&self, ordinal: usize, total: usize, status: ItemStatus) {
        match status {
            ItemStatus::Rendered => tracing::info!("📈 Dataset {}/{} rendered", ordinal, total),
            ItemStatus::Skipped => tracing::info!("⏭️ Dataset {}/{} skipped", ordinal, total),
        }
    }
}

/// Single-line textual progress bar on stderr.
pub struct TextProgressBar {
    label: String,
    width: usize,
}

impl TextProgressBar {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            width: 30,
        }
    }

    pub fn line(&self, done: usize, total: usize) -> String {
        let filled = if total == 0 {
            self.width
        } else {
            done * self.width / total
        };
        format!(
            "{}: [{}{}] {}/{}",
            self.label,
            "#".repeat(filled),
            " ".repeat(self.width - filled),
            done,
            total
        )
    }

    fn print(&self, done: usize, total: usize) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.line(done, total));
        let _ = stderr.flush();
    }
}

impl ProgressObserver for TextProgressBar {
    fn on_start(&self, total: usize) {
        self.print(0, total);
    }

    fn on_item(&self, ordinal: usize, total: usize, _status: ItemStatus) {
        self.print(ordinal, total);
    }

    fn on_finish(&self, _total: usize) {
        let _ = writeln!(std::io::stderr());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_line() {
        let bar = TextProgressBar::new("Processing datasets");
        assert_eq!(
            bar.line(0, 3),
            format!("Processing datasets: [{}] 0/3", " ".repeat(30))
        );
        assert_eq!(
            bar.line(1, 3),
            format!("Processing datasets: [{}{}] 1/3", "#".repeat(10), " ".repeat(20))
        );
        assert_eq!(
            bar.line(3, 3),
            format!("Processing datasets: [{}] 3/3", "#".repeat(30))
        );
    }
}
