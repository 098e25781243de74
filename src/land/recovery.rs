//! Conflict recovery: rebase the rest of the stack onto the new trunk

use super::progress::{ProgressCallback, StepOutcome};
use super::PrInfo;
use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::git::Git;
use tracing::{debug, info};

/// Commands an operator runs to fix a conflicted branch by hand
pub fn recovery_commands(repo: &RepoConfig, branch: &str) -> Vec<String> {
    vec![
        format!("git checkout {branch}"),
        format!("git rebase {}", repo.remote_trunk()),
        "# resolve conflicts, then: git rebase --continue".to_string(),
        format!("git push -f {} {branch}", repo.remote),
    ]
}

/// Rebase every remaining PR's branch onto the refreshed trunk and force-push it
///
/// Stops at the first conflicting rebase with a conflict error naming all
/// remaining PRs. Leaves the checkout on the last rebased branch.
pub async fn rebase_remaining(
    git: &Git,
    repo: &RepoConfig,
    progress: &dyn ProgressCallback,
    remaining: &[PrInfo],
) -> Result<()> {
    let remote_trunk = repo.remote_trunk();
    info!(count = remaining.len(), "rebasing remaining PRs onto {remote_trunk}");

    git.fetch(Some(&repo.trunk)).await?;
    git.checkout(&repo.trunk).await?;
    git.pull_ff_only(&repo.trunk).await?;

    for pr in remaining {
        progress
            .on_step_start(&format!("Rebasing PR #{} ({})", pr.number, pr.head_branch))
            .await;

        if let Err(e) = git.fetch(Some(&pr.head_branch)).await {
            debug!(branch = %pr.head_branch, error = %e, "fetch failed, using local branch");
        }
        if git.branch_exists(&pr.head_branch).await? {
            git.checkout(&pr.head_branch).await?;
        } else {
            git.checkout_from_remote(&pr.head_branch).await?;
        }

        if git.rebase(&remote_trunk).await? {
            progress
                .on_step_finish(StepOutcome::Failed(format!(
                    "PR #{} conflicts with {remote_trunk}",
                    pr.number
                )))
                .await;
            return Err(Error::conflict(
                pr.number,
                &pr.url,
                format!("has rebase conflicts with {remote_trunk}"),
                remaining.iter().map(|p| p.url.clone()).collect(),
                recovery_commands(repo, &pr.head_branch),
            ));
        }

        git.force_push(&pr.head_branch).await?;
        progress
            .on_step_finish(StepOutcome::Done(format!(
                "Rebased and pushed {}",
                pr.head_branch
            )))
            .await;
    }

    let resting = remaining.last().map_or(repo.trunk.as_str(), |pr| &pr.head_branch);
    if let Err(e) = git.checkout(resting).await {
        debug!(branch = resting, error = %e, "checkout after rebase failed, staying on trunk");
        git.checkout(&repo.trunk).await?;
    }
    Ok(())
}
