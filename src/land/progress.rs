//! Progress reporting for landing

use super::PrInfo;
use async_trait::async_trait;

/// Where a PR is in the landing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingState {
    /// Not started
    Planned,
    /// Waiting for a mergeability verdict
    CheckingMergeability,
    /// Waiting for CI
    WaitingChecks,
    /// Merge requested (or queued through auto-merge)
    Merging,
    /// Repointing the next PR at trunk
    UpdatingBase,
    /// Rebasing the remaining PRs after a conflict
    ConflictRecovery,
    /// Deleting the merged head branch
    BranchCleanup,
    /// Merged and cleaned up
    Landed,
}

impl std::fmt::Display for LandingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Planned => "planned",
            Self::CheckingMergeability => "checking mergeability",
            Self::WaitingChecks => "waiting for checks",
            Self::Merging => "merging",
            Self::UpdatingBase => "updating base",
            Self::ConflictRecovery => "recovering from conflict",
            Self::BranchCleanup => "cleaning up branch",
            Self::Landed => "landed",
        };
        f.write_str(label)
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step succeeded
    Done(String),
    /// Step failed but landing continues
    Warning(String),
    /// Step failed and landing stops
    Failed(String),
}

/// Callback for landing progress
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when work on a PR starts (`index` is zero-based)
    async fn on_pr_start(&self, index: usize, total: usize, pr: &PrInfo);

    /// Called when a PR moves to a new state
    async fn on_state(&self, pr_number: u64, state: LandingState);

    /// Called when a long-running step starts
    async fn on_step_start(&self, message: &str);

    /// Called when the current step finishes
    async fn on_step_finish(&self, outcome: StepOutcome);

    /// Called for informational messages
    async fn on_message(&self, message: &str);
}

/// Progress callback that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_pr_start(&self, _index: usize, _total: usize, _pr: &PrInfo) {}
    async fn on_state(&self, _pr_number: u64, _state: LandingState) {}
    async fn on_step_start(&self, _message: &str) {}
    async fn on_step_finish(&self, _outcome: StepOutcome) {}
    async fn on_message(&self, _message: &str) {}
}
