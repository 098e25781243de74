//! Classification of raw forge status

use crate::platform::{RawCheck, RawPrStatus, RawReview};
use crate::types::{
    CheckBucket, CheckStatus, ChecksStatus, Mergeable, MergeStateStatus, PrStatus, ReviewSummary,
};
use chrono::{DateTime, Utc};

/// Map a raw check to a bucket; `None` for shapes we do not understand
pub fn classify_check(raw: &RawCheck) -> Option<CheckStatus> {
    match raw {
        RawCheck::CheckRun {
            name,
            status,
            conclusion,
        } => {
            let conclusion = conclusion.as_deref().unwrap_or_default().to_ascii_uppercase();
            let bucket = match conclusion.as_str() {
                "SUCCESS" => CheckBucket::Pass,
                "FAILURE" | "CANCELLED" | "TIMED_OUT" | "ACTION_REQUIRED" => CheckBucket::Fail,
                _ if status
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case("COMPLETED")) =>
                {
                    CheckBucket::Pass
                }
                _ => CheckBucket::Pending,
            };
            Some(CheckStatus {
                name: name.clone(),
                bucket,
            })
        }
        RawCheck::StatusContext { context, state } => {
            let state = state.as_deref().unwrap_or_default().to_ascii_uppercase();
            let bucket = match state.as_str() {
                "SUCCESS" => CheckBucket::Pass,
                "FAILURE" | "ERROR" => CheckBucket::Fail,
                _ => CheckBucket::Pending,
            };
            Some(CheckStatus {
                name: context.clone(),
                bucket,
            })
        }
        RawCheck::Unknown => None,
    }
}

/// Summarize reviews: changes requested > approved > review required > comments
pub fn summarize_reviews(reviews: &[RawReview], decision: Option<&str>) -> ReviewSummary {
    let count = |state: &str| {
        reviews
            .iter()
            .filter(|r| r.state.eq_ignore_ascii_case(state))
            .count()
    };
    let changes_requested = count("CHANGES_REQUESTED");
    let approved = count("APPROVED");
    let commented = count("COMMENTED");

    if changes_requested > 0 {
        ReviewSummary::ChangesRequested(changes_requested)
    } else if approved > 0 {
        ReviewSummary::Approved(approved)
    } else if decision.is_some_and(|d| d.eq_ignore_ascii_case("REVIEW_REQUIRED")) {
        ReviewSummary::ReviewRequired
    } else if commented > 0 {
        ReviewSummary::Commented(commented)
    } else {
        ReviewSummary::Empty
    }
}

/// Turn a raw snapshot into a classified status
pub fn classify_status(raw: RawPrStatus, now: DateTime<Utc>) -> PrStatus {
    let checks: Vec<CheckStatus> = raw.checks.iter().filter_map(classify_check).collect();
    let checks_status = ChecksStatus::aggregate(checks.iter().map(|c| &c.bucket));
    let review_summary = summarize_reviews(&raw.reviews, raw.review_decision.as_deref());

    PrStatus {
        state: raw.state,
        mergeable: raw.mergeable.map(Mergeable::from).unwrap_or_default(),
        merge_state: raw
            .merge_state_status
            .map(MergeStateStatus::from)
            .unwrap_or_default(),
        checks_status,
        checks,
        review_decision: raw.review_decision,
        review_summary,
        last_updated: Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(status: &str, conclusion: Option<&str>) -> RawCheck {
        RawCheck::CheckRun {
            name: "build".to_string(),
            status: Some(status.to_string()),
            conclusion: conclusion.map(ToString::to_string),
        }
    }

    fn context(state: &str) -> RawCheck {
        RawCheck::StatusContext {
            context: "ci/legacy".to_string(),
            state: Some(state.to_string()),
        }
    }

    fn review(state: &str) -> RawReview {
        RawReview {
            state: state.to_string(),
            author: None,
        }
    }

    fn bucket(raw: &RawCheck) -> CheckBucket {
        classify_check(raw).unwrap().bucket
    }

    #[test]
    fn test_check_run_buckets() {
        assert_eq!(bucket(&run("COMPLETED", Some("SUCCESS"))), CheckBucket::Pass);
        assert_eq!(bucket(&run("COMPLETED", Some("NEUTRAL"))), CheckBucket::Pass);
        assert_eq!(bucket(&run("COMPLETED", Some("SKIPPED"))), CheckBucket::Pass);
        for failed in ["FAILURE", "CANCELLED", "TIMED_OUT", "ACTION_REQUIRED"] {
            assert_eq!(bucket(&run("COMPLETED", Some(failed))), CheckBucket::Fail);
        }
        assert_eq!(bucket(&run("IN_PROGRESS", None)), CheckBucket::Pending);
        assert_eq!(bucket(&run("QUEUED", Some(""))), CheckBucket::Pending);
    }

    #[test]
    fn test_status_context_buckets() {
        assert_eq!(bucket(&context("SUCCESS")), CheckBucket::Pass);
        assert_eq!(bucket(&context("FAILURE")), CheckBucket::Fail);
        assert_eq!(bucket(&context("ERROR")), CheckBucket::Fail);
        assert_eq!(bucket(&context("PENDING")), CheckBucket::Pending);
        assert_eq!(bucket(&context("EXPECTED")), CheckBucket::Pending);
    }

    #[test]
    fn test_unknown_check_is_dropped() {
        assert!(classify_check(&RawCheck::Unknown).is_none());
    }

    #[test]
    fn test_review_priority() {
        let reviews = [review("APPROVED"), review("CHANGES_REQUESTED"), review("COMMENTED")];
        assert_eq!(
            summarize_reviews(&reviews, Some("APPROVED")),
            ReviewSummary::ChangesRequested(1)
        );
        assert_eq!(
            summarize_reviews(&reviews[..1], None),
            ReviewSummary::Approved(1)
        );
        assert_eq!(
            summarize_reviews(&reviews[2..], Some("REVIEW_REQUIRED")),
            ReviewSummary::ReviewRequired
        );
        assert_eq!(summarize_reviews(&reviews[2..], None), ReviewSummary::Commented(1));
        assert_eq!(summarize_reviews(&[], None), ReviewSummary::Empty);
    }

    #[test]
    fn test_classify_status_aggregates_checks() {
        let raw = RawPrStatus {
            mergeable: Some("MERGEABLE".to_string()),
            merge_state_status: Some("UNSTABLE".to_string()),
            checks: vec![run("COMPLETED", Some("SUCCESS")), context("PENDING")],
            ..RawPrStatus::default()
        };
        let status = classify_status(raw, Utc::now());
        assert_eq!(status.checks_status, ChecksStatus::Pending);
        assert_eq!(status.mergeable, Mergeable::Mergeable);
        assert_eq!(status.merge_state, MergeStateStatus::Unstable);
        assert_eq!(status.checks.len(), 2);
    }
}
