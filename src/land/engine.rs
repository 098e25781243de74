//! The landing state machine
//!
//! PRs land strictly in stack order, one at a time. Each PR goes through
//! mergeability, checks, merge, base propagation, optional conflict recovery,
//! branch cleanup and a local sync before the next one starts.

use super::body::cleanup_body;
use super::plan::{LandingPlan, PrInfo};
use super::poll::{Poll, Polled, Poller};
use super::preflight::{self, Preflight, PreflightCtx};
use super::progress::{LandingState, NoopProgress, ProgressCallback, StepOutcome};
use super::prompt::{NoPrompter, Prompter};
use super::recovery::{rebase_remaining, recovery_commands};
use crate::config::{LandConfig, MergeStrategy, RepoConfig};
use crate::error::{Error, Result};
use crate::exec::{CommandSubmitter, Submitter};
use crate::git::Git;
use crate::platform::{CheckScope, MergeRequest, PlatformService};
use crate::stack::{AuthorFilter, stacked_commits};
use crate::status::{MergeVerdict, StatusTracker};
use crate::types::{CheckBucket, CheckStatus, Mergeable, MergeStateStatus, PrState};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Merge errors meaning the repository has auto-merge disabled
const AUTO_MERGE_DISABLED: [&str; 2] = ["enablePullRequestAutoMerge", "auto merge is not allowed"];

/// Outcome of a landing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandReport {
    /// PRs merged in this run (or that would be, in a dry run)
    pub landed: Vec<u64>,
    /// PRs that were already merged and got skipped
    pub already_merged: Vec<u64>,
    /// Non-fatal problems the operator must know about
    pub warnings: Vec<String>,
    /// A base update failed; the stack is only partially updated
    pub degraded: bool,
    /// Nothing was mutated
    pub dry_run: bool,
}

impl LandReport {
    /// One-line summary, e.g. `3 PRs landed`
    pub fn summary(&self) -> String {
        let count = self.landed.len();
        let noun = if count == 1 { "PR" } else { "PRs" };
        if self.dry_run {
            format!("[DRY-RUN] Would land {count} {noun}")
        } else {
            format!("{count} {noun} landed")
        }
    }
}

/// Lands a stack of PRs
pub struct Lander {
    git: Git,
    platform: Arc<dyn PlatformService>,
    tracker: StatusTracker,
    repo: RepoConfig,
    config: LandConfig,
    progress: Arc<dyn ProgressCallback>,
    prompter: Arc<dyn Prompter>,
    submitter: Arc<dyn Submitter>,
}

impl Lander {
    /// Create a lander with silent progress and no operator
    pub fn new(
        git: Git,
        platform: Arc<dyn PlatformService>,
        repo: RepoConfig,
        config: LandConfig,
    ) -> Self {
        Self {
            git,
            tracker: StatusTracker::new(Arc::clone(&platform)),
            platform,
            repo,
            config,
            progress: Arc::new(NoopProgress),
            prompter: Arc::new(NoPrompter),
            submitter: Arc::new(CommandSubmitter::default()),
        }
    }

    /// Report progress to `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Ask `prompter` for decisions
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Push the stack with `submitter` when pre-flight asks for a sync
    #[must_use]
    pub fn with_submitter(mut self, submitter: Arc<dyn Submitter>) -> Self {
        self.submitter = submitter;
        self
    }

    /// Status tracker bound to the same forge
    pub const fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Landing policy
    pub const fn config(&self) -> &LandConfig {
        &self.config
    }

    /// Operator input
    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    /// Progress reporter
    pub fn progress(&self) -> &dyn ProgressCallback {
        self.progress.as_ref()
    }

    /// Check the checkout and build the landing plan
    pub async fn preflight(&self) -> Result<Preflight> {
        preflight::run(&PreflightCtx {
            git: &self.git,
            platform: self.platform.as_ref(),
            repo: &self.repo,
            policy: self.config.sync_policy,
            prompter: self.prompter.as_ref(),
            submitter: self.submitter.as_ref(),
        })
        .await
    }

    /// Land every PR in the plan, bottom first
    ///
    /// Stops at the first fatal error; PRs landed before it stay landed.
    pub async fn land(&self, plan: &mut LandingPlan) -> Result<LandReport> {
        let mut report = LandReport {
            dry_run: self.config.dry_run,
            ..LandReport::default()
        };
        let total = plan.len();
        info!(total, dry_run = self.config.dry_run, "landing stack");

        for index in 0..total {
            let pr = &plan.prs()[index];
            if pr.status.is_merged() {
                debug!(pr_number = pr.number, "already merged");
                self.progress
                    .on_message(&format!("PR #{} is already merged, skipping", pr.number))
                    .await;
                report.already_merged.push(pr.number);
                continue;
            }
            self.progress.on_pr_start(index, total, pr).await;
            self.land_one(plan, index, &mut report).await?;
        }

        let summary = report.summary();
        info!(landed = report.landed.len(), degraded = report.degraded, "{summary}");
        self.progress.on_message(&summary).await;
        Ok(report)
    }

    async fn land_one(
        &self,
        plan: &mut LandingPlan,
        index: usize,
        report: &mut LandReport,
    ) -> Result<()> {
        let pr = plan.prs()[index].clone();
        let number = pr.number;

        self.progress
            .on_state(number, LandingState::CheckingMergeability)
            .await;
        let verdict = self.wait_for_mergeability(number).await?;
        if verdict.is_conflicting() {
            self.progress
                .on_step_finish(StepOutcome::Failed(format!("PR #{number} {}", verdict.reason)))
                .await;
            return Err(Error::conflict(
                number,
                &pr.url,
                verdict.reason,
                vec![pr.url.clone()],
                recovery_commands(&self.repo, &pr.head_branch),
            ));
        }
        let deferred = verdict.merge_state.needs_deferred_merge();
        if deferred {
            self.progress
                .on_message(&format!("PR #{number} {}; using auto-merge", verdict.reason))
                .await;
        }

        if self.config.require_checks {
            self.progress.on_state(number, LandingState::WaitingChecks).await;
            self.wait_for_checks(number).await?;
        }

        let head = self.platform.head_sha(number).await?;
        if head != pr.head_sha {
            info!(pr_number = number, old = %pr.head_sha, new = %head, "PR head moved, adopting it");
            plan.prs_mut()[index].head_sha.clone_from(&head);
        }

        if self.config.dry_run {
            self.progress
                .on_message(&format!("[DRY-RUN] Would merge PR #{number}: {}", pr.title))
                .await;
            report.landed.push(number);
            return Ok(());
        }

        if self.config.merge_strategy == MergeStrategy::Manual
            && !self
                .prompter
                .confirm(&format!("Merge PR #{number}: {}?", pr.title))?
        {
            return Err(Error::Cancelled(format!("merge of PR #{number} declined")));
        }

        self.progress.on_state(number, LandingState::Merging).await;
        let queued = self
            .merge(&pr, &head, deferred || self.config.auto_merge)
            .await?;
        if queued {
            self.wait_for_merge(number).await?;
        }

        let mut base_moved = true;
        if index + 1 < plan.len() {
            self.progress.on_state(number, LandingState::UpdatingBase).await;
            base_moved = self.update_next_base(plan, index, report).await?;
        }

        if self.config.delete_branch {
            if base_moved {
                self.progress.on_state(number, LandingState::BranchCleanup).await;
                self.delete_branch(&pr.head_branch, report).await;
            } else {
                let next = plan.prs()[index + 1].number;
                let warning = format!(
                    "kept branch {}: PR #{next} still targets it",
                    pr.head_branch
                );
                warn!(branch = %pr.head_branch, pr_number = next, "skipping branch cleanup");
                self.progress.on_message(&warning).await;
                report.warnings.push(warning);
            }
        }

        self.sync_local(plan, index + 1, report).await?;

        plan.prs_mut()[index].status.state = Some(PrState::Merged);
        self.progress.on_state(number, LandingState::Landed).await;
        info!(pr_number = number, "landed");
        report.landed.push(number);
        Ok(())
    }

    /// Ask for mergeability, retrying while GitHub is still computing it
    async fn wait_for_mergeability(&self, number: u64) -> Result<MergeVerdict> {
        let poller = Poller::attempts(self.config.unknown_retries, self.config.unknown_retry_delay);
        match poller.run(|| self.poll_mergeability(number)).await? {
            Polled::Ready(verdict) => Ok(verdict),
            Polled::Exhausted(verdict) => {
                warn!(pr_number = number, "mergeability still unknown, proceeding");
                Ok(verdict)
            }
        }
    }

    async fn poll_mergeability(&self, number: u64) -> Result<Poll<MergeVerdict>> {
        let verdict = self.tracker.check_mergeability(number).await?;
        let unknown = verdict.merge_state == MergeStateStatus::Unknown
            && verdict.mergeable != Mergeable::Conflicting;
        if unknown {
            debug!(pr_number = number, "mergeability unknown");
            Ok(Poll::Pending(verdict))
        } else {
            Ok(Poll::Ready(verdict))
        }
    }

    async fn wait_for_checks(&self, number: u64) -> Result<()> {
        if self.config.dry_run {
            // one snapshot, no waiting
            match self.poll_checks(number).await {
                Ok(Poll::Ready(summary) | Poll::Pending(summary)) => {
                    self.progress
                        .on_message(&format!("[DRY-RUN] PR #{number} checks: {summary}"))
                        .await;
                }
                Err(Error::ChecksFailed { checks, .. }) => {
                    self.progress
                        .on_message(&format!(
                            "[DRY-RUN] PR #{number} has failing checks: {}",
                            checks.join(", ")
                        ))
                        .await;
                }
                Err(e) => return Err(e),
            }
            return Ok(());
        }

        self.progress
            .on_step_start(&format!("Waiting for checks on PR #{number}"))
            .await;
        let result = Poller::timed(self.config.poll_interval, self.config.timeout)
            .until(format!("checks on PR #{number}"), || self.poll_checks(number))
            .await;
        match &result {
            Ok(summary) => self.progress.on_step_finish(StepOutcome::Done(summary.clone())).await,
            Err(e) => self.progress.on_step_finish(StepOutcome::Failed(e.to_string())).await,
        }
        result.map(|_| ())
    }

    /// Checks that gate the merge under the configured strategy
    async fn gating_checks(&self, number: u64) -> Result<Vec<CheckStatus>> {
        match &self.config.merge_strategy {
            MergeStrategy::RequiredOnly | MergeStrategy::Manual => {
                self.platform.list_checks(number, CheckScope::Required).await
            }
            MergeStrategy::AllChecks => self.platform.list_checks(number, CheckScope::All).await,
            MergeStrategy::Custom(names) => {
                let all = self.platform.list_checks(number, CheckScope::All).await?;
                Ok(names
                    .iter()
                    .map(|name| {
                        all.iter().find(|c| &c.name == name).cloned().unwrap_or_else(|| {
                            // not reported yet
                            CheckStatus {
                                name: name.clone(),
                                bucket: CheckBucket::Pending,
                            }
                        })
                    })
                    .collect())
            }
        }
    }

    async fn poll_checks(&self, number: u64) -> Result<Poll<String>> {
        let checks = self.gating_checks(number).await?;
        if checks.is_empty() {
            return Ok(Poll::Ready("no required checks".to_string()));
        }

        let names = |bucket: CheckBucket| -> Vec<String> {
            checks
                .iter()
                .filter(|c| c.bucket == bucket)
                .map(|c| c.name.clone())
                .collect()
        };

        let failed = names(CheckBucket::Fail);
        if !failed.is_empty() {
            if !self.config.auto_retry {
                return Err(Error::ChecksFailed {
                    pr_number: number,
                    checks: failed,
                });
            }
            let message = format!("PR #{number}: {} failed, waiting for a re-run", failed.join(", "));
            self.progress.on_message(&message).await;
            return Ok(Poll::Pending(message));
        }

        let pending = names(CheckBucket::Pending);
        if pending.is_empty() {
            return Ok(Poll::Ready(format!("{} checks passed", checks.len())));
        }
        let message = format!("PR #{number}: waiting for {}", pending.join(", "));
        self.progress.on_message(&message).await;
        Ok(Poll::Pending(message))
    }

    /// Request the squash merge; `Ok(true)` when it was queued via auto-merge
    async fn merge(&self, pr: &PrInfo, head_sha: &str, auto: bool) -> Result<bool> {
        let body = match self.platform.pr_body(pr.number).await {
            Ok(body) => cleanup_body(&body),
            Err(e) => {
                debug!(pr_number = pr.number, error = %e, "could not read PR body");
                String::new()
            }
        };
        let mut request = MergeRequest {
            number: pr.number,
            subject: pr.title.clone(),
            body,
            head_sha: Some(head_sha.to_string()),
            auto,
        };

        self.progress
            .on_step_start(&format!("Merging PR #{}", pr.number))
            .await;
        let result = match self.platform.merge(&request).await {
            Err(e) if request.auto && AUTO_MERGE_DISABLED.iter().any(|m| e.mentions(m)) => {
                info!(pr_number = pr.number, "auto-merge disabled for this repository, merging directly");
                request.auto = false;
                self.platform.merge(&request).await
            }
            other => other,
        };

        match result {
            Ok(()) => {
                let done = if request.auto {
                    format!("Auto-merge enabled for PR #{}", pr.number)
                } else {
                    format!("Merged PR #{}", pr.number)
                };
                self.progress.on_step_finish(StepOutcome::Done(done)).await;
                Ok(request.auto)
            }
            Err(e) => {
                self.progress
                    .on_step_finish(StepOutcome::Failed(e.to_string()))
                    .await;
                Err(Error::MergeFailed {
                    pr_number: pr.number,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn wait_for_merge(&self, number: u64) -> Result<()> {
        self.progress
            .on_step_start(&format!("Waiting for auto-merge of PR #{number}"))
            .await;
        let result = Poller::timed(self.config.poll_interval, self.config.timeout)
            .until(format!("auto-merge of PR #{number}"), || self.poll_merge(number))
            .await;
        match &result {
            Ok(()) => {
                self.progress
                    .on_step_finish(StepOutcome::Done(format!("PR #{number} merged")))
                    .await;
            }
            Err(e) => self.progress.on_step_finish(StepOutcome::Failed(e.to_string())).await,
        }
        result
    }

    async fn poll_merge(&self, number: u64) -> Result<Poll<()>> {
        let progress = self.platform.merge_progress(number).await?;
        match progress.state {
            PrState::Merged => Ok(Poll::Ready(())),
            PrState::Closed => Err(Error::MergeFailed {
                pr_number: number,
                message: "PR was closed before the auto-merge completed".to_string(),
            }),
            PrState::Open => {
                debug!(pr_number = number, merge_state = %progress.merge_state, "waiting for auto-merge");
                Ok(Poll::Pending(()))
            }
        }
    }

    /// Point the next PR at trunk, recovering if that makes it conflict
    ///
    /// `Ok(false)` when the next PR still targets the merged branch.
    async fn update_next_base(
        &self,
        plan: &mut LandingPlan,
        index: usize,
        report: &mut LandReport,
    ) -> Result<bool> {
        let merged = plan.prs()[index].number;
        let next = plan.prs()[index + 1].clone();
        let trunk = &self.repo.trunk;

        self.progress
            .on_step_start(&format!("Updating PR #{} base to {trunk}", next.number))
            .await;
        match self.platform.update_base(next.number, trunk).await {
            Ok(()) => {
                plan.prs_mut()[index + 1].base_branch.clone_from(trunk);
                self.progress
                    .on_step_finish(StepOutcome::Done(format!(
                        "PR #{} now targets {trunk}",
                        next.number
                    )))
                    .await;
            }
            Err(e) if e.mentions("closed") => {
                self.progress
                    .on_step_finish(StepOutcome::Failed(format!("PR #{} is closed", next.number)))
                    .await;
                return Err(Error::ClosedDependent {
                    pr_number: next.number,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let warning = format!("could not update base of PR #{}: {e}", next.number);
                warn!(pr_number = next.number, error = %e, "base update failed");
                self.progress
                    .on_step_finish(StepOutcome::Warning(warning.clone()))
                    .await;
                report.warnings.push(warning);
                report.degraded = true;
                return Ok(false);
            }
        }

        sleep(self.config.settle_delay).await;
        if !self.conflicts(next.number, report).await {
            return Ok(true);
        }

        warn!(pr_number = next.number, "conflicts after base update, rebasing remaining PRs");
        self.progress
            .on_state(merged, LandingState::ConflictRecovery)
            .await;
        let remaining = &plan.prs()[index + 1..];
        rebase_remaining(&self.git, &self.repo, self.progress.as_ref(), remaining).await?;

        sleep(self.config.recovery_settle_delay).await;
        if self.conflicts(next.number, report).await {
            return Err(Error::conflict(
                next.number,
                &next.url,
                "still has merge conflicts after rebasing the stack",
                remaining.iter().map(|pr| pr.url.clone()).collect(),
                recovery_commands(&self.repo, &next.head_branch),
            ));
        }
        Ok(true)
    }

    /// Conflict check after a base change; a failed query only degrades the run
    async fn conflicts(&self, number: u64, report: &mut LandReport) -> bool {
        match self.tracker.check_conflicts(number).await {
            Ok(conflicting) => conflicting,
            Err(e) => {
                let warning = format!("could not check PR #{number} for conflicts: {e}");
                warn!(pr_number = number, error = %e, "conflict check failed");
                self.progress.on_message(&warning).await;
                report.warnings.push(warning);
                report.degraded = true;
                false
            }
        }
    }

    async fn delete_branch(&self, branch: &str, report: &mut LandReport) {
        self.progress
            .on_step_start(&format!("Deleting branch {branch}"))
            .await;
        match self.git.delete_remote_branch(branch).await {
            Ok(()) => {
                self.progress
                    .on_step_finish(StepOutcome::Done(format!("Deleted branch {branch}")))
                    .await;
            }
            Err(e) => {
                let warning = format!("could not delete branch {branch}: {e}");
                warn!(branch, error = %e, "branch cleanup failed");
                self.progress
                    .on_step_finish(StepOutcome::Warning(warning.clone()))
                    .await;
                report.warnings.push(warning);
            }
        }
    }

    /// Fast-forward local trunk, then move the rest of the stack onto it
    ///
    /// Leaves the checkout on the newest remaining branch, or on trunk when
    /// nothing remains.
    async fn sync_local(
        &self,
        plan: &mut LandingPlan,
        next: usize,
        report: &mut LandReport,
    ) -> Result<()> {
        let trunk = &self.repo.trunk;
        let remote_trunk = self.repo.remote_trunk();

        self.progress
            .on_step_start(&format!("Pulling latest {trunk}"))
            .await;
        self.git.fetch(Some(trunk)).await?;
        self.git.checkout(trunk).await?;
        self.git.pull_ff_only(trunk).await?;

        let Some(tip) = plan.prs().last().filter(|_| next < plan.len()).cloned() else {
            self.progress
                .on_step_finish(StepOutcome::Done(format!("Local {trunk} is up to date")))
                .await;
            return Ok(());
        };

        if let Err(e) = self.git.checkout(&tip.head_branch).await {
            let warning = format!("could not check out {}: {e}", tip.head_branch);
            warn!(branch = %tip.head_branch, error = %e, "local sync skipped");
            self.progress
                .on_step_finish(StepOutcome::Warning(warning.clone()))
                .await;
            report.warnings.push(warning);
            return Ok(());
        }

        if self.git.rebase(&remote_trunk).await? {
            self.progress
                .on_step_finish(StepOutcome::Failed(format!(
                    "{} conflicts with {remote_trunk}",
                    tip.head_branch
                )))
                .await;
            return Err(Error::conflict(
                tip.number,
                &tip.url,
                format!("has rebase conflicts with {remote_trunk}"),
                plan.prs()[next..].iter().map(|pr| pr.url.clone()).collect(),
                recovery_commands(&self.repo, &tip.head_branch),
            ));
        }

        let authors = AuthorFilter::for_repo(&self.repo);
        let stack = stacked_commits(&self.git, &remote_trunk, "HEAD", &authors).await?;
        for pr in &mut plan.prs_mut()[next..] {
            let Some(commit) = stack.by_remote_ref(&pr.head_branch) else {
                debug!(branch = %pr.head_branch, "no local commit for branch");
                continue;
            };
            if let Err(e) = self.git.push_commit(&commit.hash, &pr.head_branch).await {
                let warning = format!("could not push {}: {e}", pr.head_branch);
                warn!(branch = %pr.head_branch, error = %e, "push after rebase failed");
                report.warnings.push(warning);
                continue;
            }
            pr.head_sha.clone_from(&commit.hash);
            pr.commit = commit.clone();
            pr.commit.pr_number = pr.number;
        }

        self.progress
            .on_step_finish(StepOutcome::Done(format!(
                "Rebased remaining PRs onto {remote_trunk}"
            )))
            .await;
        Ok(())
    }
}
