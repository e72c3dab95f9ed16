use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use tracing::info;

/// Progress reporting for an export run.
///
/// Draws a bar on interactive terminals and falls back to log lines otherwise.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    is_interactive: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        Self::with_interactive(std::io::stdout().is_terminal())
    }

    /// Create a reporter that never draws, for tests and piped output
    pub fn hidden() -> Self {
        Self::with_interactive(false)
    }

    fn with_interactive(is_interactive: bool) -> Self {
        ProgressReporter {
            bar: None,
            is_interactive,
        }
    }

    /// Check if we're in an interactive terminal
    pub fn is_interactive(&self) -> bool {
        self.is_interactive
    }

    /// Start tracking `total` issues
    pub fn start(&mut self, total: usize) {
        if !self.is_interactive {
            info!("Exporting {} issues", total);
            return;
        }

        let pb = ProgressBar::new(total as u64);
        pb.set_draw_target(ProgressDrawTarget::stdout());
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} issues {msg}")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        self.bar = Some(pb);
    }

    /// Report that work on an issue has begun
    pub fn issue_started(&self, number: u32, title: &str) {
        match &self.bar {
            Some(pb) => pb.set_message(format!("#{}", number)),
            None => info!("Processing issue #{}: {}", number, title),
        }
    }

    /// Report that an issue is done
    pub fn issue_finished(&self) {
        if let Some(pb) = &self.bar {
            pb.inc(1);
        }
    }

    /// Print a line without corrupting the bar
    pub fn println(&self, line: impl AsRef<str>) {
        match &self.bar {
            Some(pb) => pb.println(line),
            None => println!("{}", line.as_ref()),
        }
    }

    /// Finish and clear the bar
    pub fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_reporter_never_draws() {
        let mut progress = ProgressReporter::hidden();
        assert!(!progress.is_interactive());

        progress.start(3);
        progress.issue_started(1, "First");
        progress.issue_finished();
        progress.finish();
        assert!(progress.bar.is_none());
    }
}
