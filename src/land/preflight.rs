//! Pre-flight: clean tree, stack/remote agreement, plan construction

use super::plan::{LandingPlan, build_plan};
use crate::config::{RepoConfig, SyncPolicy};
use crate::error::{Error, Result};
use crate::exec::Submitter;
use crate::git::Git;
use crate::land::prompt::Prompter;
use crate::platform::PlatformService;
use crate::stack::{AuthorFilter, Commit, Stack, stacked_commits};
use tracing::{debug, info};

/// What pre-flight produced
#[derive(Debug)]
pub enum Preflight {
    /// Ready to land
    Ready(LandingPlan),
    /// The stack was pushed first; PRs need review before landing
    Submitted,
    /// Nothing between trunk and HEAD
    Empty,
}

/// Pre-flight inputs, borrowed from the lander
pub(crate) struct PreflightCtx<'a> {
    pub git: &'a Git,
    pub platform: &'a dyn PlatformService,
    pub repo: &'a RepoConfig,
    pub policy: SyncPolicy,
    pub prompter: &'a dyn Prompter,
    pub submitter: &'a dyn Submitter,
}

impl PreflightCtx<'_> {
    async fn read_stack(&self) -> Result<Stack> {
        let authors = AuthorFilter::for_repo(self.repo);
        stacked_commits(self.git, &self.repo.remote_trunk(), "HEAD", &authors).await
    }

    /// Apply the sync policy; `Ok(true)` means push first
    fn should_sync(&self, question: &str) -> Result<bool> {
        match self.policy {
            SyncPolicy::Always => Ok(true),
            SyncPolicy::Never => Err(Error::Validation(format!(
                "{question} (sync disabled, push the stack and retry)"
            ))),
            SyncPolicy::Prompt => self.prompter.confirm(question),
        }
    }

    /// First commit of the lead PR's remote branch, if it can be read
    async fn remote_lead(&self, head_ref: &str) -> Option<String> {
        if let Err(e) = self.git.fetch(Some(head_ref)).await {
            debug!(branch = head_ref, error = %e, "fetch of lead branch failed");
            return None;
        }
        let range = format!("{}..{}/{head_ref}", self.repo.remote_trunk(), self.repo.remote);
        match self.git.rev_list_reverse(&range).await {
            Ok(commits) => commits.into_iter().next(),
            Err(e) => {
                debug!(branch = head_ref, error = %e, "could not list remote commits");
                None
            }
        }
    }

    /// Compare the lead commit with its PR
    async fn lead_sync(&self, lead: &Commit) -> Result<LeadSync> {
        let Some(remote_ref) = lead.remote_ref() else {
            return Ok(LeadSync::NoPr(format!(
                "Commit {} has no PR yet. Push the stack first?",
                lead.short_hash()
            )));
        };
        let Some(pr) = self.platform.find_open_pr(remote_ref).await? else {
            return Ok(LeadSync::NoPr(format!(
                "Commit {} has no open PR. Push the stack first?",
                lead.short_hash()
            )));
        };
        match self.remote_lead(&pr.head_ref).await {
            Some(remote) if !lead.matches_hash(&remote) => Ok(LeadSync::Diverged(format!(
                "PR #{} does not match your local commit {}. Sync the stack first?",
                pr.number,
                lead.short_hash()
            ))),
            _ => Ok(LeadSync::InSync),
        }
    }
}

enum LeadSync {
    InSync,
    NoPr(String),
    Diverged(String),
}

/// Verify the checkout and build the landing plan
pub(crate) async fn run(ctx: &PreflightCtx<'_>) -> Result<Preflight> {
    if !ctx.git.is_clean().await? {
        return Err(Error::DirtyWorkingTree);
    }

    let mut stack = ctx.read_stack().await?;
    let Some(lead) = stack.active().next().cloned() else {
        info!("no commits to land");
        return Ok(Preflight::Empty);
    };

    match ctx.lead_sync(&lead).await? {
        LeadSync::InSync => {}
        LeadSync::NoPr(question) => {
            sync(ctx, &question).await?;
            // freshly opened PRs need review before they can land
            return Ok(Preflight::Submitted);
        }
        LeadSync::Diverged(question) => {
            sync(ctx, &question).await?;
            stack = ctx.read_stack().await?;
        }
    }

    let plan = build_plan(&stack, ctx.platform).await?;
    debug!(count = plan.len(), "plan ready");
    Ok(Preflight::Ready(plan))
}

async fn sync(ctx: &PreflightCtx<'_>, question: &str) -> Result<()> {
    if !ctx.should_sync(question)? {
        return Err(Error::Cancelled("stack is not in sync with its PRs".to_string()));
    }
    info!("pushing stack before landing");
    ctx.submitter.submit().await
}
