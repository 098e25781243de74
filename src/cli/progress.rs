//! Terminal progress reporter

use crate::cli::style::{Stylize, WARN, check, cross, hyperlink, spinner_style};
use anstream::println;
use async_trait::async_trait;
use git_pr::land::{LandingState, PrInfo, ProgressCallback, StepOutcome};
use indicatif::ProgressBar;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Prints landing progress, with a spinner while a step runs
#[derive(Default)]
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a reporter
    pub fn new() -> Self {
        Self::default()
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner.lock().ok().and_then(|mut s| s.take())
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_pr_start(&self, index: usize, total: usize, pr: &PrInfo) {
        println!();
        println!(
            "{} Landing PR {}: {}",
            format!("[{}/{total}]", index + 1).muted(),
            format!("#{}", pr.number).accent(),
            pr.title.emphasis()
        );
        println!("  {}", hyperlink(&pr.url, &pr.url).muted());
    }

    async fn on_state(&self, pr_number: u64, state: LandingState) {
        debug!(pr_number, %state, "state");
    }

    async fn on_step_start(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("{message}..."));
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock()
            && let Some(previous) = slot.replace(spinner)
        {
            previous.finish_and_clear();
        }
    }

    async fn on_step_finish(&self, outcome: StepOutcome) {
        let line = match outcome {
            StepOutcome::Done(message) => format!("{} {message}", check()),
            StepOutcome::Warning(message) => format!("{} {}", WARN.warn(), message.warn()),
            StepOutcome::Failed(message) => format!("{} {}", cross(), message.error()),
        };
        match self.take_spinner() {
            Some(spinner) => spinner.finish_with_message(line),
            None => println!("  {line}"),
        }
    }

    async fn on_message(&self, message: &str) {
        let active = self.spinner.lock().ok().and_then(|s| s.clone());
        match active {
            Some(spinner) => spinner.set_message(message.to_string()),
            None => println!("  {message}"),
        }
    }
}
