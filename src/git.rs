//! Typed git operations
//!
//! Thin wrappers over [`CommandRunner::run_git`] so the landing engine never
//! assembles raw argument lists itself.

use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use std::sync::Arc;
use tracing::debug;

/// Git operations bound to one remote
#[derive(Clone)]
pub struct Git {
    runner: Arc<dyn CommandRunner>,
    remote: String,
}

impl Git {
    /// Create a git adapter pushing to `remote`
    pub fn new(runner: Arc<dyn CommandRunner>, remote: impl Into<String>) -> Self {
        Self {
            runner,
            remote: remote.into(),
        }
    }

    /// Remote name
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Run raw git arguments
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        self.runner.run_git(args).await
    }

    /// Whether the working tree has no uncommitted changes
    pub async fn is_clean(&self) -> Result<bool> {
        let out = self.run(&["status", "--porcelain"]).await?;
        Ok(out.trim().is_empty())
    }

    /// URL of the configured remote
    pub async fn remote_url(&self) -> Result<String> {
        self.run(&["remote", "get-url", &self.remote]).await
    }

    /// `git config --get <key>`, `None` when unset
    pub async fn config_value(&self, key: &str) -> Result<Option<String>> {
        match self.run(&["config", "--get", key]).await {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) => Ok(None),
            // git config exits 1 for a missing key
            Err(Error::Vcs { output, .. }) if output.lines().next() == Some("exit code 1") => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch one branch (or everything when `branch` is `None`)
    pub async fn fetch(&self, branch: Option<&str>) -> Result<()> {
        match branch {
            Some(branch) => self.run(&["fetch", &self.remote, branch]).await?,
            None => self.run(&["fetch", &self.remote]).await?,
        };
        Ok(())
    }

    /// Check out an existing local branch
    pub async fn checkout(&self, branch: &str) -> Result<()> {
        self.run(&["checkout", branch]).await?;
        Ok(())
    }

    /// Create `branch` tracking `<remote>/<branch>` and check it out
    pub async fn checkout_from_remote(&self, branch: &str) -> Result<()> {
        let start = format!("{}/{branch}", self.remote);
        self.run(&["checkout", "-b", branch, &start]).await?;
        Ok(())
    }

    /// Whether a local branch exists
    pub async fn branch_exists(&self, branch: &str) -> Result<bool> {
        let out = self.run(&["branch", "--list", branch]).await?;
        Ok(!out.trim().is_empty())
    }

    /// Fast-forward the current branch from the remote
    pub async fn pull_ff_only(&self, branch: &str) -> Result<()> {
        self.run(&["pull", "--ff-only", &self.remote, branch]).await?;
        Ok(())
    }

    /// Rebase the current branch onto `upstream`
    ///
    /// Returns `Ok(true)` when the rebase stopped on a conflict (after
    /// aborting it, so the checkout is left clean).
    pub async fn rebase(&self, upstream: &str) -> Result<bool> {
        match self.run(&["rebase", upstream]).await {
            Ok(_) => Ok(false),
            Err(e) if e.mentions("CONFLICT") => {
                debug!(upstream, "rebase stopped on conflict, aborting");
                if let Err(abort) = self.run(&["rebase", "--abort"]).await {
                    debug!(error = %abort, "rebase --abort failed");
                }
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Force-push the current branch to its namesake on the remote
    pub async fn force_push(&self, branch: &str) -> Result<()> {
        self.run(&["push", "-f", &self.remote, branch]).await?;
        Ok(())
    }

    /// Push a commit to a remote branch, refusing to clobber unseen updates
    pub async fn push_commit(&self, sha: &str, remote_ref: &str) -> Result<()> {
        let refspec = format!("{sha}:refs/heads/{remote_ref}");
        self.run(&["push", "--force-with-lease", &self.remote, &refspec])
            .await?;
        Ok(())
    }

    /// Delete a remote branch
    ///
    /// A branch that is already gone counts as deleted.
    pub async fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        match self.run(&["push", &self.remote, "--delete", branch]).await {
            Ok(_) => Ok(()),
            Err(e) if e.mentions("remote ref does not exist") || e.mentions("unable to delete") => {
                debug!(branch, "remote branch already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve a revision to a full hash
    pub async fn rev_parse(&self, rev: &str) -> Result<String> {
        self.run(&["rev-parse", rev]).await
    }

    /// Commits in `range`, oldest first
    pub async fn rev_list_reverse(&self, range: &str) -> Result<Vec<String>> {
        let out = self.run(&["rev-list", "--reverse", range]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Whether a commit's tree equals its parent's tree
    ///
    /// Anything other than two tree hashes (root commit, odd output) is
    /// reported as not empty.
    pub async fn is_empty_commit(&self, hash: &str) -> Result<bool> {
        let tree = format!("{hash}^{{tree}}");
        let parent_tree = format!("{hash}~1^{{tree}}");
        let out = match self.run(&["rev-parse", &tree, &parent_tree]).await {
            Ok(out) => out,
            Err(Error::Vcs { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        let trees: Vec<&str> = out.lines().map(str::trim).collect();
        Ok(trees.len() == 2 && trees[0] == trees[1])
    }

    /// Raw `git log` output for `base..target`
    pub async fn log(&self, base: &str, target: &str) -> Result<String> {
        let range = format!("{base}..{target}");
        self.run(&["log", "-100", "--no-decorate", "--date=iso-strict", &range])
            .await
    }
}
