//! git-pr - land stacked GitHub pull requests
//!
//! ## Commands
//!
//! - `land`: merge the stack's PRs bottom-up, retargeting and rebasing the rest
//! - `status`: show the stack's PRs with mergeability, checks and reviews

mod cli;

use anstream::eprintln;
use clap::{Args, Parser, Subcommand};
use cli::context::RepoArgs;
use cli::style::{Stylize, cross};
use cli::{LandOptions, run_land, run_status};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "git-pr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Land stacked GitHub pull requests one at a time", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Remote the PRs live on (default: origin)
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Trunk branch the stack lands into (default: main)
    #[arg(long, global = true)]
    trunk: Option<String>,

    /// Repository path
    #[arg(short = 'C', long, global = true, default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the stack's PRs one at a time, bottom first
    Land(LandArgs),

    /// Show the status of the stack's PRs
    Status {
        /// Include commits authored by others
        #[arg(long)]
        include_other_authors: bool,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct LandArgs {
    /// Describe what would happen without merging or pushing
    #[arg(long)]
    dry_run: bool,

    /// Review the stack in a dashboard before landing
    #[arg(short, long)]
    interactive: bool,

    /// Seconds to wait for checks or a queued merge
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Seconds between status polls
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Keep head branches after merging
    #[arg(long)]
    no_delete_branch: bool,

    /// Merge without waiting for checks
    #[arg(long)]
    no_checks: bool,

    /// Merge through GitHub auto-merge
    #[arg(long)]
    auto: bool,

    /// Which checks gate a merge: required, all, custom or manual
    #[arg(long, value_name = "STRATEGY")]
    strategy: Option<String>,

    /// Check name for the custom strategy (repeatable)
    #[arg(long = "check", value_name = "NAME")]
    checks: Vec<String>,

    /// Keep waiting when a check fails, in case it is re-run
    #[arg(long)]
    auto_retry: bool,

    /// In the dashboard, return to the prompt after a failure
    #[arg(long)]
    pause_on_fail: bool,

    /// Push the stack without asking when it is out of sync
    #[arg(short, long, conflicts_with = "no_sync")]
    yes: bool,

    /// Fail instead of pushing when the stack is out of sync
    #[arg(long)]
    no_sync: bool,

    /// Include commits authored by others
    #[arg(long)]
    include_other_authors: bool,
}

impl From<LandArgs> for LandOptions {
    fn from(args: LandArgs) -> Self {
        let sync = match (args.yes, args.no_sync) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Self {
            dry_run: args.dry_run,
            interactive: args.interactive,
            timeout_secs: args.timeout,
            poll_interval_secs: args.poll_interval,
            keep_branches: args.no_delete_branch,
            skip_checks: args.no_checks,
            auto_merge: args.auto,
            strategy: args.strategy,
            checks: args.checks,
            auto_retry: args.auto_retry,
            pause_on_fail: args.pause_on_fail,
            sync,
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "warn,git_pr=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut repo_args = RepoArgs {
        remote: cli.remote,
        trunk: cli.trunk,
        include_other_authors: false,
    };

    match cli.command {
        Commands::Land(args) => {
            repo_args.include_other_authors = args.include_other_authors;
            run_land(&cli.path, &repo_args, args.into()).await?;
        }
        Commands::Status {
            include_other_authors,
        } => {
            repo_args.include_other_authors = include_other_authors;
            run_status(&cli.path, &repo_args).await?;
        }
    }
    Ok(())
}

fn report_error(error: &anyhow::Error) {
    eprintln!("{} {}", cross(), format!("{error:#}").error());

    let Some(error) = error.downcast_ref::<git_pr::Error>() else {
        return;
    };
    let urls = error.affected_urls();
    if !urls.is_empty() {
        eprintln!("\n{}", "Affected PRs:".emphasis());
        for url in urls {
            eprintln!("  {url}");
        }
    }
    let commands = error.recovery_commands();
    if !commands.is_empty() {
        eprintln!("\n{}", "To recover:".emphasis());
        for command in commands {
            eprintln!("  {}", command.accent());
        }
    }
}
