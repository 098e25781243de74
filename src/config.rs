//! Run-time configuration
//!
//! Configuration is an explicit value threaded through the lander, status
//! tracker and dashboard. Defaults come from an optional TOML file in the
//! user's config directory; CLI flags override them.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name for git-pr config within the user config dir
const CONFIG_DIR: &str = "git-pr";

/// Config filename
const CONFIG_FILE: &str = "config.toml";

/// When to consider a PR's checks done
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Wait for required checks only
    #[default]
    RequiredOnly,
    /// Wait for every check
    AllChecks,
    /// Wait for a named set of checks
    Custom(Vec<String>),
    /// Ask the operator before each merge
    Manual,
}

impl MergeStrategy {
    /// Parse a strategy name (`required`, `all`, `custom`, `manual`)
    pub fn parse(name: &str, custom_checks: &[String]) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "required" | "required-only" => Ok(Self::RequiredOnly),
            "all" | "all-checks" => Ok(Self::AllChecks),
            "custom" => {
                if custom_checks.is_empty() {
                    return Err(Error::Config(
                        "merge strategy 'custom' needs at least one check name".to_string(),
                    ));
                }
                Ok(Self::Custom(custom_checks.to_vec()))
            }
            "manual" => Ok(Self::Manual),
            other => Err(Error::Config(format!("unknown merge strategy '{other}'"))),
        }
    }
}

/// What to do when the local stack and the remote PRs disagree before landing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Ask the operator
    #[default]
    Prompt,
    /// Push without asking
    Always,
    /// Never push; abort instead
    Never,
}

/// Landing policy for one run
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct LandConfig {
    /// Budget for each wait (checks, deferred merge)
    pub timeout: Duration,
    /// Interval between polls
    pub poll_interval: Duration,
    /// Delete the head branch after merging
    pub delete_branch: bool,
    /// Wait for CI checks before merging
    pub require_checks: bool,
    /// Use GitHub's auto-merge (deferred merge)
    pub auto_merge: bool,
    /// Describe mutations instead of performing them
    pub dry_run: bool,
    /// Show the interactive dashboard
    pub interactive: bool,
    /// Which checks gate a merge
    pub merge_strategy: MergeStrategy,
    /// Keep polling after a check fails (it may be re-run)
    pub auto_retry: bool,
    /// In the dashboard, return to the prompt after a failed landing
    pub pause_on_fail: bool,
    /// Pre-flight push/sync decision
    pub sync_policy: SyncPolicy,
    /// Pause after a base update so GitHub recomputes mergeability
    pub settle_delay: Duration,
    /// Pause after force-pushing rebased branches
    pub recovery_settle_delay: Duration,
    /// Delay between retries while mergeability is unknown
    pub unknown_retry_delay: Duration,
    /// Retries while mergeability is unknown
    pub unknown_retries: u32,
}

impl Default for LandConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20 * 60),
            poll_interval: Duration::from_secs(15),
            delete_branch: true,
            require_checks: true,
            auto_merge: false,
            dry_run: false,
            interactive: false,
            merge_strategy: MergeStrategy::RequiredOnly,
            auto_retry: false,
            pause_on_fail: false,
            sync_policy: SyncPolicy::Prompt,
            settle_delay: Duration::from_secs(2),
            recovery_settle_delay: Duration::from_secs(5),
            unknown_retry_delay: Duration::from_secs(2),
            unknown_retries: 3,
        }
    }
}

/// Repository facts: where to push, which branch is trunk, who "I" am
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Remote name (e.g. "origin")
    pub remote: String,
    /// Trunk branch name (e.g. "main")
    pub trunk: String,
    /// Forge host (e.g. "github.com")
    pub host: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// `git config user.email`
    pub email: String,
    /// Land commits authored by others too
    pub include_other_authors: bool,
}

impl RepoConfig {
    /// `<remote>/<trunk>`
    pub fn remote_trunk(&self) -> String {
        format!("{}/{}", self.remote, self.trunk)
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Web URL of a PR
    pub fn pr_url(&self, number: u64) -> String {
        format!("https://{}/{}/{}/pull/{number}", self.host, self.owner, self.repo)
    }
}

/// Parse `host`, `owner` and `repo` from a remote URL
///
/// Accepts `git@host:owner/repo(.git)`, `ssh://git@host/owner/repo(.git)`
/// and `https://host/owner/repo(.git)`.
pub fn parse_remote_url(url: &str) -> Result<(String, String, String)> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);

    let (host, path) = if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://"))
    {
        let rest = rest.rsplit_once('@').map_or(rest, |(_, r)| r);
        rest.split_once('/')
            .ok_or_else(|| Error::Config(format!("cannot parse remote url '{url}'")))?
    } else if let Some((user_host, path)) = url.split_once(':') {
        let host = user_host.rsplit_once('@').map_or(user_host, |(_, h)| h);
        (host, path)
    } else {
        return Err(Error::Config(format!("cannot parse remote url '{url}'")));
    };

    // ssh://host:22/owner/repo
    let host = host.split(':').next().unwrap_or(host);

    let (owner, repo) = path
        .rsplit_once('/')
        .ok_or_else(|| Error::Config(format!("cannot parse owner/repo from '{url}'")))?;
    if host.is_empty() || owner.is_empty() || repo.is_empty() {
        return Err(Error::Config(format!("cannot parse remote url '{url}'")));
    }
    Ok((host.to_string(), owner.to_string(), repo.to_string()))
}

/// Defaults read from `<config_dir>/git-pr/config.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Remote name
    pub remote: Option<String>,
    /// Trunk branch
    pub trunk: Option<String>,
    /// Wait budget in seconds
    pub timeout_secs: Option<u64>,
    /// Poll interval in seconds
    pub poll_interval_secs: Option<u64>,
    /// Delete merged branches
    pub delete_branch: Option<bool>,
    /// Wait for checks
    pub require_checks: Option<bool>,
    /// Use auto-merge
    pub auto_merge: Option<bool>,
    /// `required`, `all`, `custom` or `manual`
    pub merge_strategy: Option<String>,
    /// Checks for the `custom` strategy
    pub custom_checks: Vec<String>,
    /// Land other authors' commits
    pub include_other_authors: Option<bool>,
    /// Command that pushes the stack and opens PRs
    pub submit_command: Option<Vec<String>>,
}

impl FileConfig {
    /// Apply file values on top of `LandConfig::default()`
    pub fn land_config(&self) -> Result<LandConfig> {
        let defaults = LandConfig::default();
        let merge_strategy = self
            .merge_strategy
            .as_deref()
            .map(|name| MergeStrategy::parse(name, &self.custom_checks))
            .transpose()?
            .unwrap_or(defaults.merge_strategy.clone());

        Ok(LandConfig {
            timeout: self
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            poll_interval: self
                .poll_interval_secs
                .map_or(defaults.poll_interval, Duration::from_secs),
            delete_branch: self.delete_branch.unwrap_or(defaults.delete_branch),
            require_checks: self.require_checks.unwrap_or(defaults.require_checks),
            auto_merge: self.auto_merge.unwrap_or(defaults.auto_merge),
            merge_strategy,
            ..defaults
        })
    }
}

/// Path to the config file (`None` if the platform has no config dir)
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the config file; a missing file yields defaults
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}
