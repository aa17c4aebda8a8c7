//! Output formatting for the CLI.

use console::style;

use swr_cache::CacheStatus;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose {
            return;
        }
        println!("{} {}", style("·").dim(), style(msg).dim());
    }

    /// Print one resolved read as a status line.
    pub fn resolution(&self, path: &str, status: CacheStatus, value: Option<&str>, millis: u128) {
        let tag = match status {
            CacheStatus::Hit => style(format!("{status:>8}")).green(),
            CacheStatus::Stale => style(format!("{status:>8}")).yellow(),
            CacheStatus::Miss => style(format!("{status:>8}")).blue(),
            CacheStatus::Accepted => style(format!("{status:>8}")).magenta(),
        };
        let value = value.unwrap_or("-");
        println!("{tag} {path:<20} {millis:>5}ms  {value}");
    }
}
