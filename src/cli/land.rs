//! Land command - merge the current stack's PRs bottom-up

use crate::cli::context::{CommandContext, RepoArgs};
use crate::cli::progress::CliProgress;
use crate::cli::prompt::TerminalPrompter;
use crate::cli::style::{Stylize, WARN, check, spinner_style};
use anstream::println;
use git_pr::config::{LandConfig, MergeStrategy, SyncPolicy};
use git_pr::dashboard::Dashboard;
use git_pr::error::Result;
use git_pr::land::{LandReport, Lander, Preflight};
use indicatif::ProgressBar;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Options for the land command; `None` keeps the config file's value
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct LandOptions {
    /// Describe mutations instead of performing them
    pub dry_run: bool,
    /// Open the dashboard instead of landing straight away
    pub interactive: bool,
    /// Wait budget in seconds
    pub timeout_secs: Option<u64>,
    /// Poll interval in seconds
    pub poll_interval_secs: Option<u64>,
    /// Keep merged branches
    pub keep_branches: bool,
    /// Do not wait for checks
    pub skip_checks: bool,
    /// Merge through auto-merge
    pub auto_merge: bool,
    /// `required`, `all`, `custom` or `manual`
    pub strategy: Option<String>,
    /// Checks for the `custom` strategy
    pub checks: Vec<String>,
    /// Keep waiting when a check fails
    pub auto_retry: bool,
    /// Return to the dashboard after a failure
    pub pause_on_fail: bool,
    /// Pre-flight sync decision (`None` asks)
    pub sync: Option<bool>,
}

impl LandOptions {
    /// Apply the options on top of the file-derived config
    pub fn apply(&self, config: &mut LandConfig) -> Result<()> {
        config.dry_run = self.dry_run;
        config.interactive = self.interactive;
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        if self.keep_branches {
            config.delete_branch = false;
        }
        if self.skip_checks {
            config.require_checks = false;
        }
        config.auto_merge |= self.auto_merge;
        if let Some(name) = &self.strategy {
            config.merge_strategy = MergeStrategy::parse(name, &self.checks)?;
        } else if !self.checks.is_empty() {
            config.merge_strategy = MergeStrategy::Custom(self.checks.clone());
        }
        config.auto_retry = self.auto_retry;
        config.pause_on_fail = self.pause_on_fail;
        config.sync_policy = match self.sync {
            Some(true) => SyncPolicy::Always,
            Some(false) => SyncPolicy::Never,
            None => SyncPolicy::Prompt,
        };
        Ok(())
    }
}

/// Run the land command
#[allow(clippy::future_not_send)]
pub async fn run_land(path: &Path, repo_args: &RepoArgs, options: LandOptions) -> Result<()> {
    // =========================================================================
    // Phase 1: GATHER - repository, config, stack and PRs
    // =========================================================================

    let ctx = CommandContext::new(path, repo_args).await?;
    let mut config = ctx.file.land_config()?;
    options.apply(&mut config)?;
    let interactive = config.interactive;

    let lander = Lander::new(ctx.git, ctx.platform, ctx.repo, config)
        .with_progress(Arc::new(CliProgress::new()))
        .with_prompter(Arc::new(TerminalPrompter))
        .with_submitter(Arc::new(ctx.submitter));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message("Reading stack...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let preflight = lander.preflight().await;
    spinner.finish_and_clear();

    // =========================================================================
    // Phase 2: PLAN - the stack's PRs in landing order
    // =========================================================================

    let mut plan = match preflight? {
        Preflight::Ready(plan) => plan,
        Preflight::Empty => {
            println!("{}", "No commits to land between trunk and HEAD.".muted());
            return Ok(());
        }
        Preflight::Submitted => {
            println!(
                "{} Commits pushed and PRs created. Run {} again once they are ready.",
                check(),
                "git-pr land".accent()
            );
            return Ok(());
        }
    };

    // =========================================================================
    // Phase 3: EXECUTE - land, directly or from the dashboard
    // =========================================================================

    let report = if interactive {
        let mut dashboard =
            Dashboard::new(&lander, anstream::stdout()).clear_screen(std::io::stdout().is_terminal());
        dashboard.run(&mut plan).await?
    } else {
        let verb = if lander.config().dry_run { "Would land" } else { "Landing" };
        println!(
            "{} {}",
            verb.emphasis(),
            format!("{} PR(s)...", plan.len()).accent()
        );
        lander.land(&mut plan).await?
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &LandReport) {
    let numbers = |prs: &[u64]| {
        prs.iter()
            .map(|n| format!("#{n}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!();
    if !report.landed.is_empty() {
        let label = if report.dry_run { "Would land:" } else { "Landed:" };
        println!("   {label} {}", numbers(&report.landed).accent());
    }
    if !report.already_merged.is_empty() {
        println!(
            "   {}",
            format!("Already merged: {}", numbers(&report.already_merged)).muted()
        );
    }
    for warning in &report.warnings {
        println!("{} {}", WARN.warn(), warning.warn());
    }
    if report.degraded {
        println!(
            "{}",
            "   Some PR bases were not updated; retarget them to trunk before landing them."
                .muted()
        );
    }
}
