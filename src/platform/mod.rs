//! Forge access
//!
//! [`PlatformService`] is everything the landing engine and status tracker
//! need from GitHub. [`GitHubService`] implements it on top of the `gh` CLI,
//! so authentication is whatever `gh auth login` set up.

mod github;
mod graphql;

pub use github::GitHubService;
pub use graphql::{RawCheck, RawPrStatus, RawReview};

use crate::error::Result;
use crate::types::{CheckStatus, Mergeable, MergeStateStatus, PrState, PullRequest};
use async_trait::async_trait;

/// Mergeability verdicts of one PR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mergeability {
    /// `mergeable`
    pub mergeable: Mergeable,
    /// `mergeStateStatus`
    pub merge_state: MergeStateStatus,
}

impl Mergeability {
    /// Conflicting by either verdict
    pub fn is_conflicting(&self) -> bool {
        self.mergeable == Mergeable::Conflicting || self.merge_state.is_conflicting()
    }
}

/// State observed while waiting for a deferred merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeProgress {
    /// Open/closed/merged
    pub state: PrState,
    /// Merge-readiness
    pub merge_state: MergeStateStatus,
}

/// Which checks to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    /// Only checks marked required by branch protection
    Required,
    /// Every check on the head commit
    All,
}

/// A squash-merge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// PR to merge
    pub number: u64,
    /// Squash commit subject
    pub subject: String,
    /// Squash commit body (empty = no body)
    pub body: String,
    /// Expected head commit; the forge rejects the merge if it moved
    pub head_sha: Option<String>,
    /// Queue through auto-merge instead of merging now
    pub auto: bool,
}

/// Forge operations used while landing
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Find the open PR whose head is `head_branch`
    async fn find_open_pr(&self, head_branch: &str) -> Result<Option<PullRequest>>;

    /// Current head commit of a PR
    async fn head_sha(&self, number: u64) -> Result<String>;

    /// Raw description of a PR
    async fn pr_body(&self, number: u64) -> Result<String>;

    /// Mergeability verdicts
    async fn mergeability(&self, number: u64) -> Result<Mergeability>;

    /// State and merge-readiness, for the deferred merge wait
    async fn merge_progress(&self, number: u64) -> Result<MergeProgress>;

    /// Checks on a PR's head commit
    ///
    /// An empty list means no (required) checks are configured.
    async fn list_checks(&self, number: u64, scope: CheckScope) -> Result<Vec<CheckStatus>>;

    /// Request a squash merge
    async fn merge(&self, request: &MergeRequest) -> Result<()>;

    /// Repoint a PR at a new base branch
    async fn update_base(&self, number: u64, base: &str) -> Result<()>;

    /// Status of many PRs in one round trip, aligned with `numbers`
    ///
    /// An entry is `None` when the forge returned nothing for that PR.
    async fn batch_status(&self, numbers: &[u64]) -> Result<Vec<Option<RawPrStatus>>>;

    /// Status of one PR
    async fn pr_status(&self, number: u64) -> Result<RawPrStatus>;
}
