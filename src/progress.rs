//! Progress Reporting
//!
//! The enrichment pipeline reports one tick per resolved role. Reporting
//! never fails: a sink that cannot draw simply draws nothing.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress notifications from long-running operations
pub trait ProgressSink: Send + Sync {
    fn start(&self, _total: u64) {}

    fn advance(&self);

    fn finish(&self) {}
}

/// Sink that ignores all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&self) {}
}

/// Progress bar on stderr; hidden when stderr is not a terminal
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new(message: &str) -> Self {
        let bar = if std::io::stderr().is_terminal() {
            let style = ProgressStyle::with_template(
                "{msg} [{bar:40.green}] {pos}/{len} [{elapsed_precise}]",
            )
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());

            ProgressBar::new(0)
                .with_style(style)
                .with_message(message.to_string())
        } else {
            ProgressBar::hidden()
        };

        Self { bar }
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn advance(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
