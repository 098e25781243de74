//! Landing plan: the stack's PRs in landing order

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::stack::{Commit, Stack};
use crate::types::PrStatus;
use tracing::debug;

/// One PR to land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrInfo {
    /// PR number
    pub number: u64,
    /// Commit title (used for the squash subject)
    pub title: String,
    /// Web URL
    pub url: String,
    /// Commit the PR is expected to point at
    pub head_sha: String,
    /// Head branch (the commit's remote-ref)
    pub head_branch: String,
    /// Base branch at planning time
    pub base_branch: String,
    /// Local commit backing the PR
    pub commit: Commit,
    /// Latest status snapshot
    pub status: PrStatus,
}

/// PRs in landing order, bottom of the stack first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingPlan {
    prs: Vec<PrInfo>,
}

impl LandingPlan {
    /// Wrap PRs that are already in landing order
    pub fn new(prs: Vec<PrInfo>) -> Self {
        Self { prs }
    }

    /// PRs in landing order
    pub fn prs(&self) -> &[PrInfo] {
        &self.prs
    }

    /// Mutable PRs, for status refreshes and head updates
    pub fn prs_mut(&mut self) -> &mut [PrInfo] {
        &mut self.prs
    }

    /// Number of PRs
    pub fn len(&self) -> usize {
        self.prs.len()
    }

    /// Whether there is nothing to land
    pub fn is_empty(&self) -> bool {
        self.prs.is_empty()
    }

    /// PR by position
    pub fn get(&self, index: usize) -> Option<&PrInfo> {
        self.prs.get(index)
    }

    /// Whether the forge reports every PR as merged
    pub fn all_merged(&self) -> bool {
        self.prs.iter().all(|pr| pr.status.is_merged())
    }

    /// PR numbers in landing order
    pub fn numbers(&self) -> Vec<u64> {
        self.prs.iter().map(|pr| pr.number).collect()
    }
}

/// Resolve every active commit of the stack to its open PR
pub async fn build_plan(stack: &Stack, platform: &dyn PlatformService) -> Result<LandingPlan> {
    let mut prs = Vec::new();
    for commit in stack.active() {
        let Some(remote_ref) = commit.remote_ref() else {
            return Err(Error::Validation(format!(
                "commit {} has no remote-ref; push the stack first",
                commit.short_hash()
            )));
        };
        let pr = platform.find_open_pr(remote_ref).await?.ok_or_else(|| {
            Error::Validation(format!(
                "no PR found for commit {} ({remote_ref})",
                commit.short_hash()
            ))
        })?;

        debug!(pr_number = pr.number, branch = remote_ref, "planned");
        let mut commit = commit.clone();
        commit.pr_number = pr.number;
        prs.push(PrInfo {
            number: pr.number,
            title: commit.title.clone(),
            url: pr.html_url,
            head_sha: commit.hash.clone(),
            head_branch: pr.head_ref,
            base_branch: pr.base_ref,
            commit,
            status: PrStatus::default(),
        });
    }
    Ok(LandingPlan::new(prs))
}
