//! Live PR status tracking
//!
//! Refreshes the status of every PR in a landing plan, preferring one batch
//! query and falling back to per-PR queries when the batch fails.

mod checks;

pub use checks::{classify_check, classify_status, summarize_reviews};

use crate::error::Result;
use crate::land::{LandingPlan, PrInfo};
use crate::platform::PlatformService;
use crate::types::{Mergeable, MergeStateStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a full refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Why the batch query failed, if it did
    pub batch_error: Option<String>,
    /// PRs whose status could not be refreshed and keep their old snapshot
    pub stale: Vec<u64>,
}

impl RefreshReport {
    /// Whether every PR got a fresh snapshot
    pub fn is_complete(&self) -> bool {
        self.stale.is_empty()
    }
}

/// Mergeability verdict with an operator-facing reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeVerdict {
    /// `mergeable`
    pub mergeable: Mergeable,
    /// `mergeStateStatus`
    pub merge_state: MergeStateStatus,
    /// Why the PR cannot merge right now (empty when it can)
    pub reason: String,
}

impl MergeVerdict {
    /// Whether either verdict reports conflicts
    pub fn is_conflicting(&self) -> bool {
        self.mergeable == Mergeable::Conflicting || self.merge_state.is_conflicting()
    }
}

/// Fetches and classifies PR status
#[derive(Clone)]
pub struct StatusTracker {
    platform: Arc<dyn PlatformService>,
}

impl StatusTracker {
    /// Create a tracker over a forge
    pub fn new(platform: Arc<dyn PlatformService>) -> Self {
        Self { platform }
    }

    /// Refresh every PR in the plan
    ///
    /// Never fails: a failed batch falls back to one query per PR, and PRs
    /// that still cannot be fetched are listed in [`RefreshReport::stale`].
    pub async fn update_all_status(&self, plan: &mut LandingPlan) -> RefreshReport {
        let mut report = RefreshReport::default();
        if plan.is_empty() {
            return report;
        }

        let numbers = plan.numbers();
        match self.platform.batch_status(&numbers).await {
            Ok(statuses) => {
                let now = Utc::now();
                for (pr, raw) in plan.prs_mut().iter_mut().zip(statuses) {
                    match raw {
                        Some(raw) => pr.status = classify_status(raw, now),
                        None => {
                            debug!(pr_number = pr.number, "missing from batch response");
                            if let Err(e) = self.update_status(pr).await {
                                debug!(pr_number = pr.number, error = %e, "status refresh failed");
                                report.stale.push(pr.number);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "batch status failed, querying PRs one by one");
                report.batch_error = Some(e.to_string());
                for pr in plan.prs_mut() {
                    if let Err(e) = self.update_status(pr).await {
                        debug!(pr_number = pr.number, error = %e, "status refresh failed");
                        report.stale.push(pr.number);
                    }
                }
            }
        }
        report
    }

    /// Refresh one PR
    pub async fn update_status(&self, pr: &mut PrInfo) -> Result<()> {
        let raw = self.platform.pr_status(pr.number).await?;
        pr.status = classify_status(raw, Utc::now());
        debug!(
            pr_number = pr.number,
            merge_state = %pr.status.merge_state,
            checks = ?pr.status.checks_status,
            "status refreshed"
        );
        Ok(())
    }

    /// Ask the forge whether a PR can merge
    pub async fn check_mergeability(&self, number: u64) -> Result<MergeVerdict> {
        let m = self.platform.mergeability(number).await?;
        let mut reason = m.merge_state.reason().to_string();
        if reason.is_empty() && m.is_conflicting() {
            reason = MergeStateStatus::Dirty.reason().to_string();
        }
        Ok(MergeVerdict {
            mergeable: m.mergeable,
            merge_state: m.merge_state,
            reason,
        })
    }

    /// Whether a PR currently has conflicts
    pub async fn check_conflicts(&self, number: u64) -> Result<bool> {
        Ok(self.check_mergeability(number).await?.is_conflicting())
    }
}
