//! Unit tests for git-pr modules

mod common;

mod body_test {
    use git_pr::land::cleanup_body;

    #[test]
    fn test_strips_template_comments_and_stack_footer() {
        let body = "\
## Summary
Adds retries to the uploader.

<!-- describe your change -->

---
* #12
* **#13** ⬅
";
        assert_eq!(
            cleanup_body(body),
            "## Summary\nAdds retries to the uploader."
        );
    }

    #[test]
    fn test_untouched_template_becomes_empty() {
        let body = "## Summary\n\n<!-- what changed -->\n\n## Testing\n\n";
        assert_eq!(cleanup_body(body), "");
    }
}

mod poll_test {
    use git_pr::error::Error;
    use git_pr::land::{Poll, Polled, Poller};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_timed_poller_returns_first_ready_value() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let poller = Poller::timed(Duration::ZERO, Duration::from_secs(5));

        let result = poller
            .run(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n == 3 { Poll::Ready(n) } else { Poll::Pending(n) })
            })
            .await
            .unwrap();

        assert_eq!(result, Polled::Ready(3));
    }

    #[tokio::test]
    async fn test_check_errors_stop_polling() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let poller = Poller::attempts(5, Duration::ZERO);

        let result: Result<Polled<()>, _> = poller
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Internal("boom".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attempt_budget_is_delay_times_retries() {
        let poller = Poller::attempts(3, Duration::from_secs(2));
        assert_eq!(poller.budget(), Duration::from_secs(6));
    }
}

mod stack_test {
    use crate::common::log_entry;
    use git_pr::stack::{Stack, parse_log};

    #[test]
    fn test_parse_log_reads_remote_ref_trailer() {
        let hash = "c".repeat(40);
        let log = log_entry(&hash, "dev@example.com", "Add retries", Some("feature-retries"));

        let commits = parse_log(&log).unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].title, "Add retries");
        assert_eq!(commits[0].remote_ref(), Some("feature-retries"));
        assert_eq!(commits[0].author_email, "dev@example.com");
        assert!(commits[0].date.is_some());
    }

    #[test]
    fn test_duplicate_remote_ref_is_invalid() {
        let log = log_entry(&"a".repeat(40), "dev@example.com", "One", Some("shared"))
            + &log_entry(&"b".repeat(40), "dev@example.com", "Two", Some("shared"));
        let stack = Stack::new(parse_log(&log).unwrap());

        let err = stack.validate().unwrap_err();

        assert!(err.to_string().contains("share remote-ref shared"));
    }
}

mod config_test {
    use git_pr::config::{FileConfig, MergeStrategy, parse_remote_url};
    use std::time::Duration;

    #[test]
    fn test_file_config_overrides_defaults() {
        let file: FileConfig = toml::from_str(
            r#"
            timeout_secs = 60
            delete_branch = false
            merge_strategy = "custom"
            custom_checks = ["build", "deploy"]
            "#,
        )
        .unwrap();

        let config = file.land_config().unwrap();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.delete_branch);
        assert!(config.require_checks);
        assert_eq!(
            config.merge_strategy,
            MergeStrategy::Custom(vec!["build".to_string(), "deploy".to_string()])
        );
    }

    #[test]
    fn test_unknown_file_key_is_rejected() {
        assert!(toml::from_str::<FileConfig>("colour = true").is_err());
    }

    #[test]
    fn test_remote_url_forms() {
        for url in [
            "git@github.com:acme/widgets.git",
            "https://github.com/acme/widgets",
            "ssh://git@github.com/acme/widgets.git",
        ] {
            let (host, owner, repo) = parse_remote_url(url).unwrap();
            assert_eq!((host.as_str(), owner.as_str(), repo.as_str()), ("github.com", "acme", "widgets"));
        }
    }
}

mod status_test {
    use chrono::Utc;
    use git_pr::platform::{RawCheck, RawPrStatus, RawReview};
    use git_pr::status::classify_status;
    use git_pr::types::{ChecksStatus, MergeStateStatus, PrState, ReviewSummary};

    #[test]
    fn test_classify_open_pr_with_pending_check_and_approval() {
        let raw = RawPrStatus {
            state: Some(PrState::Open),
            mergeable: Some("MERGEABLE".to_string()),
            merge_state_status: Some("BLOCKED".to_string()),
            review_decision: Some("APPROVED".to_string()),
            reviews: vec![RawReview {
                state: "APPROVED".to_string(),
                author: None,
            }],
            checks: vec![
                RawCheck::CheckRun {
                    name: "build".to_string(),
                    status: Some("COMPLETED".to_string()),
                    conclusion: Some("SUCCESS".to_string()),
                },
                RawCheck::StatusContext {
                    context: "ci/deploy".to_string(),
                    state: Some("PENDING".to_string()),
                },
            ],
        };

        let status = classify_status(raw, Utc::now());

        assert_eq!(status.merge_state, MergeStateStatus::Blocked);
        assert_eq!(status.checks_status, ChecksStatus::Pending);
        assert_eq!(status.checks.len(), 2);
        assert_eq!(status.review_summary, ReviewSummary::Approved(1));
        assert!(!status.is_merged());
        assert!(status.last_updated.is_some());
    }
}

mod git_test {
    use crate::common::FakeRunner;
    use git_pr::exec::CommandRunner;
    use git_pr::git::Git;
    use std::sync::Arc;

    fn git_over(fake: &Arc<FakeRunner>) -> Git {
        let runner: Arc<dyn CommandRunner> = fake.clone();
        Git::new(runner, "origin")
    }

    #[tokio::test]
    async fn test_unset_config_key_is_none() {
        let fake = Arc::new(FakeRunner::new());
        fake.git_err(&["config", "--get", "user.email"], "exit code 1\n");

        let value = git_over(&fake).config_value("user.email").await.unwrap();

        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_config_failure_other_than_unset_propagates() {
        let fake = Arc::new(FakeRunner::new());
        fake.git_err(
            &["config", "--get", "user.email"],
            "exit code 128\nfatal: not in a git directory",
        );

        let result = git_over(&fake).config_value("user.email").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_config_value_is_returned() {
        let fake = Arc::new(FakeRunner::new());
        fake.git_ok(&["config", "--get", "user.email"], "dev@example.com");

        let value = git_over(&fake).config_value("user.email").await.unwrap();

        assert_eq!(value.as_deref(), Some("dev@example.com"));
    }
}

mod dashboard_test {
    use crate::common::stack_plan;
    use git_pr::dashboard::render;
    use git_pr::types::PrState;

    #[test]
    fn test_render_counts_merged_prs() {
        let mut plan = stack_plan(&[11, 12]);
        plan.prs_mut()[0].status.state = Some(PrState::Merged);

        let frame = render(&plan, None);

        assert!(frame.contains("Stack: 2 PRs"));
        assert!(frame.contains("1 merged"));
        assert!(!frame.contains("Error updating status"));
    }
}
