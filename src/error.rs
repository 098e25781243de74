//! Error types for git-pr

use std::time::Duration;
use thiserror::Error;

/// Context attached to a conflict that needs a human to resolve it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetails {
    /// PR that is (or would be) conflicting
    pub pr_number: u64,
    /// Web URL of that PR
    pub url: String,
    /// What went wrong
    pub message: String,
    /// URLs of every PR affected by the conflict (includes `url`)
    pub affected_urls: Vec<String>,
    /// Shell commands an operator can run to resolve the conflict manually
    pub recovery_commands: Vec<String>,
}

/// Errors that can occur while landing a stack
#[derive(Debug, Error)]
pub enum Error {
    /// Local checkout has uncommitted changes
    #[error("working tree has uncommitted changes")]
    DirtyWorkingTree,

    /// Stack is malformed (duplicate remote-ref, missing PR, ...)
    #[error("invalid stack: {0}")]
    Validation(String),

    /// A git invocation failed
    #[error("git {command} failed: {output}")]
    Vcs {
        /// Arguments passed to git
        command: String,
        /// Captured stdout/stderr
        output: String,
    },

    /// A GitHub CLI/API call failed
    #[error("gh {command} failed: {output}")]
    Forge {
        /// Arguments passed to gh
        command: String,
        /// Captured stdout/stderr
        output: String,
    },

    /// Merge conflict that must be resolved by a human
    #[error("PR #{} {}\n  Please resolve conflicts at: {}", .0.pr_number, .0.message, .0.url)]
    Conflict(Box<ConflictDetails>),

    /// Waiting on checks or a deferred merge exceeded the configured budget
    #[error("timeout waiting for {what} after {}s", .after.as_secs())]
    Timeout {
        /// What we were waiting for
        what: String,
        /// Budget that elapsed
        after: Duration,
    },

    /// Required checks failed
    #[error("checks failed for PR #{pr_number}: {}", .checks.join(", "))]
    ChecksFailed {
        /// PR whose checks failed
        pr_number: u64,
        /// Names of the failed checks
        checks: Vec<String>,
    },

    /// A downstream PR was closed while the run was in progress
    #[error("PR #{pr_number} was closed, cannot update base: {message}")]
    ClosedDependent {
        /// The closed PR
        pr_number: u64,
        /// Forge message
        message: String,
    },

    /// The merge request was rejected or the deferred merge was abandoned
    #[error("failed to merge PR #{pr_number}: {message}")]
    MergeFailed {
        /// PR that failed to merge
        pr_number: u64,
        /// Reason
        message: String,
    },

    /// Operator cancelled
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),

    /// Response from gh could not be parsed
    #[error("failed to parse GitHub response: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a conflict error
    pub fn conflict(
        pr_number: u64,
        url: impl Into<String>,
        message: impl Into<String>,
        affected_urls: Vec<String>,
        recovery_commands: Vec<String>,
    ) -> Self {
        Self::Conflict(Box::new(ConflictDetails {
            pr_number,
            url: url.into(),
            message: message.into(),
            affected_urls,
            recovery_commands,
        }))
    }

    /// Captured process output, for errors that carry one
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Vcs { output, .. } | Self::Forge { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Case-insensitive search in the captured output (or the message)
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.output().map_or_else(
            || self.to_string().to_lowercase().contains(&needle),
            |out| out.to_lowercase().contains(&needle),
        )
    }

    /// Shell commands to resolve a conflict manually (empty for other errors)
    pub fn recovery_commands(&self) -> &[String] {
        match self {
            Self::Conflict(details) => &details.recovery_commands,
            _ => &[],
        }
    }

    /// URLs of the PRs touched by a conflict (empty for other errors)
    pub fn affected_urls(&self) -> &[String] {
        match self {
            Self::Conflict(details) => &details.affected_urls,
            _ => &[],
        }
    }
}

/// Result type alias for git-pr operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_searches_output() {
        let err = Error::Forge {
            command: "pr merge 1".to_string(),
            output: "GraphQL: Pull request Auto merge is not allowed (enablePullRequestAutoMerge)"
                .to_string(),
        };
        assert!(err.mentions("enablePullRequestAutoMerge"));
        assert!(!err.mentions("closed"));
    }

    #[test]
    fn test_conflict_exposes_recovery_commands() {
        let err = Error::conflict(
            2,
            "https://github.com/o/r/pull/2",
            "has merge conflicts",
            vec!["https://github.com/o/r/pull/2".to_string()],
            vec!["git checkout feat-b".to_string()],
        );
        assert_eq!(err.recovery_commands(), ["git checkout feat-b"]);
        assert_eq!(err.affected_urls().len(), 1);
        assert!(err.to_string().contains("https://github.com/o/r/pull/2"));
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            what: "checks on PR #3".to_string(),
            after: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "timeout waiting for checks on PR #3 after 90s");
    }
}
