//! Core types for git-pr

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pull request as seen by the landing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL for the PR
    pub html_url: String,
    /// Head branch name
    pub head_ref: String,
    /// Head commit SHA
    pub head_sha: String,
    /// Base branch name
    pub base_ref: String,
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    /// PR is open and can be merged
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// GitHub's `mergeable` verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Mergeable {
    /// No conflicts with the base branch
    Mergeable,
    /// Conflicts with the base branch
    Conflicting,
    /// GitHub is still computing
    #[default]
    Unknown,
}

impl From<String> for Mergeable {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "MERGEABLE" => Self::Mergeable,
            "CONFLICTING" => Self::Conflicting,
            _ => Self::Unknown,
        }
    }
}

/// GitHub's `mergeStateStatus` (merge readiness, including branch protection)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MergeStateStatus {
    /// Ready to merge
    Clean,
    /// Mergeable (older API value)
    Mergeable,
    /// Ready to merge, with pre-receive hooks
    HasHooks,
    /// Has conflicts
    Conflicting,
    /// Has conflicts (GitHub's usual spelling)
    Dirty,
    /// Blocked by branch protection or missing reviews
    Blocked,
    /// Head branch is behind the base branch
    Behind,
    /// Mergeable with failing or pending non-required checks
    Unstable,
    /// Draft PR
    Draft,
    /// Still being computed
    #[default]
    Unknown,
    /// Anything GitHub adds later
    Other(String),
}

impl From<String> for MergeStateStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CLEAN" => Self::Clean,
            "MERGEABLE" => Self::Mergeable,
            "HAS_HOOKS" => Self::HasHooks,
            "CONFLICTING" => Self::Conflicting,
            "DIRTY" => Self::Dirty,
            "BLOCKED" => Self::Blocked,
            "BEHIND" => Self::Behind,
            "UNSTABLE" => Self::Unstable,
            "DRAFT" => Self::Draft,
            "UNKNOWN" | "" => Self::Unknown,
            _ => Self::Other(raw),
        }
    }
}

impl MergeStateStatus {
    /// Whether GitHub reports conflicts
    pub const fn is_conflicting(&self) -> bool {
        matches!(self, Self::Conflicting | Self::Dirty)
    }

    /// Whether the merge must go through the deferred (auto-merge) path
    pub const fn needs_deferred_merge(&self) -> bool {
        matches!(self, Self::Blocked | Self::Unstable | Self::Behind)
    }

    /// Whether the PR can be merged right now
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Clean | Self::Mergeable | Self::HasHooks)
    }

    /// Operator-facing reason for this state (empty when nothing is wrong)
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Conflicting | Self::Dirty => "has merge conflicts that must be resolved",
            Self::Blocked => "is blocked by branch protection rules or missing required reviews",
            Self::Unstable => "has failing or pending CI checks",
            Self::Behind => "needs to be updated with the base branch",
            Self::Unknown => "merge status is being computed, please retry",
            Self::Draft => "is a draft",
            Self::Clean | Self::Mergeable | Self::HasHooks | Self::Other(_) => "",
        }
    }
}

impl std::fmt::Display for MergeStateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "CLEAN"),
            Self::Mergeable => write!(f, "MERGEABLE"),
            Self::HasHooks => write!(f, "HAS_HOOKS"),
            Self::Conflicting => write!(f, "CONFLICTING"),
            Self::Dirty => write!(f, "DIRTY"),
            Self::Blocked => write!(f, "BLOCKED"),
            Self::Behind => write!(f, "BEHIND"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Draft => write!(f, "DRAFT"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Outcome bucket of a single CI check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CheckBucket {
    /// Check passed
    Pass,
    /// Check failed (or was cancelled)
    Fail,
    /// Check has not finished
    Pending,
    /// Check was skipped
    Skipping,
}

impl From<String> for CheckBucket {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "pass" | "success" => Self::Pass,
            "fail" | "failure" | "cancel" => Self::Fail,
            "skipping" | "neutral" => Self::Skipping,
            _ => Self::Pending,
        }
    }
}

/// A classified CI check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckStatus {
    /// Check name (or status context)
    pub name: String,
    /// Classified outcome
    pub bucket: CheckBucket,
}

/// Rolled-up CI status of a PR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksStatus {
    /// No checks reported
    #[default]
    None,
    /// At least one check passed and none are pending or failing
    Passing,
    /// At least one check is still running
    Pending,
    /// At least one check failed
    Failing,
}

impl ChecksStatus {
    /// Aggregate individual buckets: failing > pending > passing > none
    pub fn aggregate<'a>(buckets: impl IntoIterator<Item = &'a CheckBucket>) -> Self {
        let (mut passed, mut pending, mut failed) = (false, false, false);
        for bucket in buckets {
            match bucket {
                CheckBucket::Pass | CheckBucket::Skipping => passed = true,
                CheckBucket::Pending => pending = true,
                CheckBucket::Fail => failed = true,
            }
        }
        if failed {
            Self::Failing
        } else if pending {
            Self::Pending
        } else if passed {
            Self::Passing
        } else {
            Self::None
        }
    }
}

/// Human-readable summary of a PR's reviews
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReviewSummary {
    /// Someone requested changes (takes precedence)
    ChangesRequested(usize),
    /// Approved by N reviewers
    Approved(usize),
    /// Branch protection requires a review
    ReviewRequired,
    /// Only comments so far
    Commented(usize),
    /// Nothing to report
    #[default]
    Empty,
}

impl std::fmt::Display for ReviewSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChangesRequested(n) => write!(f, "{n} changes requested"),
            Self::Approved(n) => write!(f, "{n} approved"),
            Self::ReviewRequired => write!(f, "Review required"),
            Self::Commented(n) => write!(f, "{n} comments"),
            Self::Empty => Ok(()),
        }
    }
}

/// Live status snapshot of a PR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrStatus {
    /// Open/closed/merged (`None` until first refresh)
    pub state: Option<PrState>,
    /// Mergeability verdict
    pub mergeable: Mergeable,
    /// Merge-readiness verdict
    pub merge_state: MergeStateStatus,
    /// CI rollup
    pub checks_status: ChecksStatus,
    /// Individual checks
    pub checks: Vec<CheckStatus>,
    /// Raw review decision (`APPROVED`, `REVIEW_REQUIRED`, ...)
    pub review_decision: Option<String>,
    /// Review summary
    pub review_summary: ReviewSummary,
    /// When this snapshot was fetched
    pub last_updated: Option<DateTime<Utc>>,
}

impl PrStatus {
    /// Whether the forge reports the PR as merged
    pub fn is_merged(&self) -> bool {
        self.state == Some(PrState::Merged)
    }

    /// Whether either verdict reports conflicts
    pub fn is_conflicting(&self) -> bool {
        self.mergeable == Mergeable::Conflicting || self.merge_state.is_conflicting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_precedence() {
        use CheckBucket::{Fail, Pass, Pending};
        assert_eq!(
            ChecksStatus::aggregate(&[Fail, Pass, Pending]),
            ChecksStatus::Failing
        );
        assert_eq!(ChecksStatus::aggregate(&[Pass, Pending]), ChecksStatus::Pending);
        assert_eq!(ChecksStatus::aggregate(&[Pass, Pass]), ChecksStatus::Passing);
        let none: [CheckBucket; 0] = [];
        assert_eq!(ChecksStatus::aggregate(&none), ChecksStatus::None);
    }

    #[test]
    fn test_merge_state_parsing_is_case_insensitive() {
        assert_eq!(
            MergeStateStatus::from("dirty".to_string()),
            MergeStateStatus::Dirty
        );
        assert!(MergeStateStatus::from("CONFLICTING".to_string()).is_conflicting());
        assert_eq!(
            MergeStateStatus::from("QUEUED".to_string()),
            MergeStateStatus::Other("QUEUED".to_string())
        );
    }

    #[test]
    fn test_deferred_merge_states() {
        for raw in ["BLOCKED", "UNSTABLE", "BEHIND"] {
            assert!(MergeStateStatus::from(raw.to_string()).needs_deferred_merge());
        }
        assert!(!MergeStateStatus::Clean.needs_deferred_merge());
    }

    #[test]
    fn test_review_summary_display() {
        assert_eq!(ReviewSummary::ChangesRequested(2).to_string(), "2 changes requested");
        assert_eq!(ReviewSummary::Approved(1).to_string(), "1 approved");
        assert_eq!(ReviewSummary::Empty.to_string(), "");
    }
}
