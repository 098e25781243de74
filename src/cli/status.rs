//! Status command - show the stack's PRs once

use crate::cli::context::{CommandContext, RepoArgs};
use anstream::print;
use git_pr::dashboard::{refresh_error, render};
use git_pr::error::Result;
use git_pr::land::build_plan;
use git_pr::stack::{AuthorFilter, stacked_commits};
use git_pr::status::StatusTracker;
use std::path::Path;

/// Run the status command
#[allow(clippy::future_not_send)]
pub async fn run_status(path: &Path, repo_args: &RepoArgs) -> Result<()> {
    let ctx = CommandContext::new(path, repo_args).await?;

    let authors = AuthorFilter::for_repo(&ctx.repo);
    let stack = stacked_commits(&ctx.git, &ctx.repo.remote_trunk(), "HEAD", &authors).await?;
    let mut plan = build_plan(&stack, ctx.platform.as_ref()).await?;

    let report = StatusTracker::new(ctx.platform)
        .update_all_status(&mut plan)
        .await;
    print!("{}", render(&plan, refresh_error(&report).as_deref()));
    Ok(())
}
