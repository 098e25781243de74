//! Shared command context for CLI commands
//!
//! Resolves the repository (remote, trunk, owner/repo, operator email),
//! loads the config file and wires git and GitHub over one process runner.

use git_pr::config::{FileConfig, RepoConfig, config_path, load_file_config, parse_remote_url};
use git_pr::error::Result;
use git_pr::exec::{CommandRunner, CommandSubmitter, ProcessRunner};
use git_pr::git::Git;
use git_pr::platform::{GitHubService, PlatformService};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_REMOTE: &str = "origin";
const DEFAULT_TRUNK: &str = "main";

/// Repository selection from the command line
#[derive(Debug, Clone, Default)]
pub struct RepoArgs {
    /// `--remote`
    pub remote: Option<String>,
    /// `--trunk`
    pub trunk: Option<String>,
    /// `--include-other-authors`
    pub include_other_authors: bool,
}

/// Shared context for CLI commands that talk to git and GitHub
pub struct CommandContext {
    /// Git bound to the selected remote
    pub git: Git,
    /// GitHub over the `gh` CLI
    pub platform: Arc<dyn PlatformService>,
    /// Resolved repository facts
    pub repo: RepoConfig,
    /// Defaults from the config file
    pub file: FileConfig,
    /// Command that pushes the stack
    pub submitter: CommandSubmitter,
}

impl CommandContext {
    /// Resolve the repository at `path`
    pub async fn new(path: &Path, args: &RepoArgs) -> Result<Self> {
        let file = match config_path() {
            Some(config) => load_file_config(&config)?,
            None => FileConfig::default(),
        };

        let remote = args
            .remote
            .clone()
            .or_else(|| file.remote.clone())
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());
        let trunk = args
            .trunk
            .clone()
            .or_else(|| file.trunk.clone())
            .unwrap_or_else(|| DEFAULT_TRUNK.to_string());

        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(path));
        let git = Git::new(Arc::clone(&runner), &remote);

        let url = git.remote_url().await?;
        let (host, owner, name) = parse_remote_url(&url)?;
        let email = git.config_value("user.email").await?.unwrap_or_default();
        debug!(%host, %owner, repo = %name, %remote, %trunk, "resolved repository");

        let repo = RepoConfig {
            remote,
            trunk,
            host,
            owner,
            repo: name,
            email,
            include_other_authors: args.include_other_authors
                || file.include_other_authors.unwrap_or(false),
        };
        let platform: Arc<dyn PlatformService> =
            Arc::new(GitHubService::new(runner, repo.clone()));

        let submitter = file
            .submit_command
            .clone()
            .filter(|command| !command.is_empty())
            .map_or_else(CommandSubmitter::default, CommandSubmitter::new)
            .in_dir(path);

        Ok(Self {
            git,
            platform,
            repo,
            file,
            submitter,
        })
    }
}
