//! Operator-facing startup output.
//!
//! Startup stages (classifier load, camera connect) show an `indicatif`
//! spinner on a terminal and plain `==>` lines otherwise.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(UiMode::Auto),
            "plain" => Ok(UiMode::Plain),
            "pretty" => Ok(UiMode::Pretty),
            other => Err(anyhow!("unknown ui mode '{}' (auto, plain, pretty)", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    /// UI for the current process, probing stderr for a terminal.
    pub fn for_stderr(mode: UiMode) -> Self {
        Self::new(mode, std::io::stderr().is_terminal())
    }

    fn pretty(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Print the operator menu.
    pub fn menu(&self, items: &[String]) {
        eprintln!("Menu (type a size, 'menu' or 'quit'):");
        for (i, item) in items.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, item);
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    failure: Option<String>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
            failure: None,
        }
    }

    /// Mark the stage as failed; the reason is shown when the stage ends.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
    }

    fn finish_message(&self) -> String {
        let elapsed = format_duration(self.start.elapsed());
        match &self.failure {
            Some(reason) => format!("✘ {} ({}): {}", self.name, elapsed, reason),
            None => format!("✔ {} ({})", self.name, elapsed),
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = self.finish_message();
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes() {
        assert_eq!(UiMode::parse("Plain").unwrap(), UiMode::Plain);
        assert_eq!(UiMode::parse("auto").unwrap(), UiMode::Auto);
        assert!(UiMode::parse("fancy").is_err());
    }

    #[test]
    fn auto_follows_terminal() {
        assert!(Ui::new(UiMode::Auto, true).pretty());
        assert!(!Ui::new(UiMode::Auto, false).pretty());
        assert!(!Ui::new(UiMode::Plain, true).pretty());
    }

    #[test]
    fn failed_stage_reports_reason() {
        let mut stage = Ui::new(UiMode::Plain, false).stage("load classifier");
        stage.fail("resource missing");
        assert!(stage.finish_message().starts_with("✘ load classifier"));
        assert!(stage.finish_message().ends_with("resource missing"));
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
