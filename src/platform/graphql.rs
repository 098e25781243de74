//! Batch status query and response types

use crate::error::{Error, Result};
use crate::types::PrState;
use serde::Deserialize;
use std::collections::HashMap;

/// One rolled-up CI entry, in either of the forge's two shapes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum RawCheck {
    /// Checks API run (GitHub Actions and apps)
    CheckRun {
        /// Check name
        #[serde(default)]
        name: String,
        /// `QUEUED`, `IN_PROGRESS`, `COMPLETED`, ...
        #[serde(default)]
        status: Option<String>,
        /// `SUCCESS`, `FAILURE`, `NEUTRAL`, ... (null while running)
        #[serde(default)]
        conclusion: Option<String>,
    },
    /// Legacy commit status
    StatusContext {
        /// Status context name
        #[serde(default)]
        context: String,
        /// `SUCCESS`, `PENDING`, `FAILURE`, `ERROR`, `EXPECTED`
        #[serde(default)]
        state: Option<String>,
    },
    /// A shape this tool does not know
    #[serde(other)]
    Unknown,
}

/// One review
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawReview {
    /// `APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`, ...
    pub state: String,
    /// Reviewer
    pub author: Option<RawAuthor>,
}

/// Review author
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawAuthor {
    /// Login name
    pub login: String,
}

/// Unclassified status of one PR, as the forge reported it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPrStatus {
    /// Open/closed/merged
    pub state: Option<PrState>,
    /// `MERGEABLE`, `CONFLICTING`, `UNKNOWN`
    pub mergeable: Option<String>,
    /// `CLEAN`, `BLOCKED`, ...
    pub merge_state_status: Option<String>,
    /// `APPROVED`, `REVIEW_REQUIRED`, ...
    pub review_decision: Option<String>,
    /// Most recent reviews
    pub reviews: Vec<RawReview>,
    /// Rolled-up checks
    pub checks: Vec<RawCheck>,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct RepositoryData {
    repository: HashMap<String, Option<GraphQlPullRequest>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPullRequest {
    state: Option<PrState>,
    mergeable: Option<String>,
    merge_state_status: Option<String>,
    review_decision: Option<String>,
    reviews: Option<Nodes<RawReview>>,
    status_check_rollup: Option<Rollup>,
}

#[derive(Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

#[derive(Deserialize)]
struct Rollup {
    contexts: Option<Nodes<RawCheck>>,
}

impl From<GraphQlPullRequest> for RawPrStatus {
    fn from(pr: GraphQlPullRequest) -> Self {
        Self {
            state: pr.state,
            mergeable: pr.mergeable,
            merge_state_status: pr.merge_state_status,
            review_decision: pr.review_decision,
            reviews: pr
                .reviews
                .map(|r| r.nodes.into_iter().flatten().collect())
                .unwrap_or_default(),
            checks: pr
                .status_check_rollup
                .and_then(|r| r.contexts)
                .map(|c| c.nodes.into_iter().flatten().collect())
                .unwrap_or_default(),
        }
    }
}

/// `gh pr view --json` shape of the same fields
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PrViewStatus {
    state: Option<PrState>,
    mergeable: Option<String>,
    merge_state_status: Option<String>,
    review_decision: Option<String>,
    #[serde(default)]
    reviews: Option<Vec<RawReview>>,
    #[serde(default)]
    status_check_rollup: Option<Vec<RawCheck>>,
}

impl From<PrViewStatus> for RawPrStatus {
    fn from(pr: PrViewStatus) -> Self {
        Self {
            state: pr.state,
            mergeable: pr.mergeable,
            merge_state_status: pr.merge_state_status,
            // gh reports an empty string when there is no decision
            review_decision: pr.review_decision.filter(|d| !d.is_empty()),
            reviews: pr.reviews.unwrap_or_default(),
            checks: pr.status_check_rollup.unwrap_or_default(),
        }
    }
}

/// Alias for the i-th PR in the batch query
fn alias(index: usize) -> String {
    format!("pr{index}")
}

/// Build one query asking for every PR's status
pub(super) fn batch_query(owner: &str, repo: &str, numbers: &[u64]) -> Result<String> {
    let owner = serde_json::to_string(owner)?;
    let repo = serde_json::to_string(repo)?;

    let mut query = format!("query {{\n  repository(owner: {owner}, name: {repo}) {{");
    for (i, number) in numbers.iter().enumerate() {
        query.push_str(&format!(
            r"
    {}: pullRequest(number: {number}) {{
      number
      state
      mergeable
      mergeStateStatus
      reviewDecision
      reviews(last: 10) {{ nodes {{ state author {{ login }} }} }}
      statusCheckRollup {{
        contexts(first: 100) {{
          nodes {{
            __typename
            ... on CheckRun {{ name status conclusion }}
            ... on StatusContext {{ context state }}
          }}
        }}
      }}
    }}",
            alias(i)
        ));
    }
    query.push_str("\n  }\n}");
    Ok(query)
}

/// Parse the batch response into entries aligned with the queried numbers
pub(super) fn parse_batch_response(
    output: &str,
    count: usize,
) -> Result<Vec<Option<RawPrStatus>>> {
    let response: GraphQlResponse<RepositoryData> = serde_json::from_str(output)?;

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Forge {
            command: "api graphql".to_string(),
            output: format!("GraphQL error: {}", messages.join(", ")),
        });
    }

    let mut repository = response
        .data
        .ok_or_else(|| Error::Forge {
            command: "api graphql".to_string(),
            output: "no data in GraphQL response".to_string(),
        })?
        .repository;

    Ok((0..count)
        .map(|i| repository.remove(&alias(i)).flatten().map(RawPrStatus::from))
        .collect())
}
