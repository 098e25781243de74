//! GitHub service over the `gh` CLI

use super::graphql::{self, PrViewStatus};
use super::{CheckScope, MergeProgress, MergeRequest, Mergeability, PlatformService, RawPrStatus};
use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::types::{CheckStatus, MergeStateStatus, Mergeable, PullRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Messages `gh pr checks` prints when nothing is configured
const NO_CHECKS_MESSAGES: [&str; 2] = ["no required checks", "no checks reported"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    title: String,
    url: String,
    head_ref_name: String,
    head_ref_oid: String,
    base_ref_name: String,
}

impl From<GhPullRequest> for PullRequest {
    fn from(pr: GhPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            html_url: pr.url,
            head_ref: pr.head_ref_name,
            head_sha: pr.head_ref_oid,
            base_ref: pr.base_ref_name,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhMergeability {
    #[serde(default)]
    mergeable: Mergeable,
    #[serde(default)]
    merge_state_status: MergeStateStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhMergeProgress {
    state: crate::types::PrState,
    #[serde(default)]
    merge_state_status: MergeStateStatus,
}

/// GitHub service using the `gh` CLI
pub struct GitHubService {
    runner: Arc<dyn CommandRunner>,
    repo: RepoConfig,
}

impl GitHubService {
    /// Create a new GitHub service
    pub fn new(runner: Arc<dyn CommandRunner>, repo: RepoConfig) -> Self {
        Self { runner, repo }
    }

    async fn view<T: DeserializeOwned>(&self, number: u64, fields: &str) -> Result<T> {
        let number = number.to_string();
        let output = self
            .runner
            .run_gh(&["pr", "view", &number, "--json", fields])
            .await?;
        Ok(serde_json::from_str(&output)?)
    }
}

/// Parse `gh pr checks --json` output
///
/// `gh pr checks` exits non-zero while checks are pending or failing, so the
/// JSON array is also looked for inside a failed invocation's output.
fn parse_checks_output(output: &str) -> Option<Result<Vec<CheckStatus>>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Some(Ok(Vec::new()));
    }
    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end < start {
        return None;
    }
    Some(serde_json::from_str(&trimmed[start..=end]).map_err(Error::from))
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn find_open_pr(&self, head_branch: &str) -> Result<Option<PullRequest>> {
        debug!(head_branch, "finding open PR");
        let output = self
            .runner
            .run_gh(&[
                "pr",
                "list",
                "--head",
                head_branch,
                "--state",
                "open",
                "--json",
                "number,title,url,headRefName,headRefOid,baseRefName",
            ])
            .await?;

        let prs: Vec<GhPullRequest> = if output.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&output)?
        };
        let result = prs.into_iter().next().map(PullRequest::from);
        match &result {
            Some(pr) => debug!(head_branch, pr_number = pr.number, "found open PR"),
            None => debug!(head_branch, "no open PR"),
        }
        Ok(result)
    }

    async fn head_sha(&self, number: u64) -> Result<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Head {
            head_ref_oid: String,
        }

        let head: Head = self.view(number, "headRefOid").await?;
        debug!(pr_number = number, head = %head.head_ref_oid, "got head SHA");
        Ok(head.head_ref_oid)
    }

    async fn pr_body(&self, number: u64) -> Result<String> {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            body: String,
        }

        let body: Body = self.view(number, "body").await?;
        Ok(body.body)
    }

    async fn mergeability(&self, number: u64) -> Result<Mergeability> {
        let raw: GhMergeability = self.view(number, "mergeable,mergeStateStatus").await?;
        debug!(
            pr_number = number,
            mergeable = ?raw.mergeable,
            merge_state = %raw.merge_state_status,
            "checked mergeability"
        );
        Ok(Mergeability {
            mergeable: raw.mergeable,
            merge_state: raw.merge_state_status,
        })
    }

    async fn merge_progress(&self, number: u64) -> Result<MergeProgress> {
        let raw: GhMergeProgress = self.view(number, "state,mergeStateStatus").await?;
        debug!(pr_number = number, state = %raw.state, merge_state = %raw.merge_state_status, "merge progress");
        Ok(MergeProgress {
            state: raw.state,
            merge_state: raw.merge_state_status,
        })
    }

    async fn list_checks(&self, number: u64, scope: CheckScope) -> Result<Vec<CheckStatus>> {
        let number_arg = number.to_string();
        let mut args = vec!["pr", "checks", number_arg.as_str()];
        if scope == CheckScope::Required {
            args.push("--required");
        }
        args.extend(["--json", "name,state,bucket"]);

        match self.runner.run_gh(&args).await {
            Ok(output) => parse_checks_output(&output).unwrap_or_else(|| {
                Err(Error::Forge {
                    command: args.join(" "),
                    output,
                })
            }),
            Err(e) if NO_CHECKS_MESSAGES.iter().any(|m| e.mentions(m)) => {
                debug!(pr_number = number, ?scope, "no checks configured");
                Ok(Vec::new())
            }
            Err(e) => match e.output().and_then(parse_checks_output) {
                Some(Ok(checks)) if !checks.is_empty() => Ok(checks),
                _ => Err(e),
            },
        }
    }

    async fn merge(&self, request: &MergeRequest) -> Result<()> {
        let number = request.number.to_string();
        let mut args = vec![
            "pr",
            "merge",
            number.as_str(),
            "--squash",
            "--subject",
            request.subject.as_str(),
            "--body",
            request.body.as_str(),
        ];
        if let Some(sha) = request.head_sha.as_deref() {
            args.extend(["--match-head-commit", sha]);
        }
        if request.auto {
            args.push("--auto");
        }

        debug!(pr_number = request.number, auto = request.auto, "merging PR");
        self.runner.run_gh(&args).await?;
        debug!(pr_number = request.number, "merge requested");
        Ok(())
    }

    async fn update_base(&self, number: u64, base: &str) -> Result<()> {
        debug!(pr_number = number, base, "updating PR base");
        let number = number.to_string();
        self.runner
            .run_gh(&["pr", "edit", &number, "--base", base])
            .await?;
        Ok(())
    }

    async fn batch_status(&self, numbers: &[u64]) -> Result<Vec<Option<RawPrStatus>>> {
        if numbers.is_empty() {
            return Ok(Vec::new());
        }
        let query = graphql::batch_query(&self.repo.owner, &self.repo.repo, numbers)?;
        let query_arg = format!("query={query}");

        debug!(count = numbers.len(), repo = %self.repo.full_name(), "batch status query");
        let output = self
            .runner
            .run_gh(&["api", "graphql", "-f", &query_arg])
            .await?;
        graphql::parse_batch_response(&output, numbers.len())
    }

    async fn pr_status(&self, number: u64) -> Result<RawPrStatus> {
        let view: PrViewStatus = self
            .view(
                number,
                "state,mergeable,mergeStateStatus,reviewDecision,reviews,statusCheckRollup",
            )
            .await?;
        Ok(view.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckBucket;

    #[test]
    fn test_parse_checks_output_inside_failure_text() {
        let output = "exit code 8\n[{\"name\":\"build\",\"state\":\"IN_PROGRESS\",\"bucket\":\"pending\"}]\n";
        let checks = parse_checks_output(output).unwrap().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].bucket, CheckBucket::Pending);
    }

    #[test]
    fn test_parse_checks_output_empty_is_no_checks() {
        assert!(parse_checks_output("").unwrap().unwrap().is_empty());
        assert!(parse_checks_output("something else").is_none());
    }
}
