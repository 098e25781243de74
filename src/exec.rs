//! External process execution
//!
//! Every git and gh invocation goes through [`CommandRunner`], so the landing
//! engine can be driven by a fake that records calls instead of touching a
//! real repository or the network.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Narrow command-execution interface used by all git/GitHub adapters
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `git <args>`; returns trimmed stdout or `Error::Vcs` with the captured output
    async fn run_git(&self, args: &[&str]) -> Result<String>;

    /// Run `gh <args>`; returns trimmed stdout or `Error::Forge` with the captured output
    async fn run_gh(&self, args: &[&str]) -> Result<String>;
}

/// Which program an invocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// git
    Git,
    /// GitHub CLI
    Gh,
}

impl Tool {
    /// Executable name
    pub const fn program(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Gh => "gh",
        }
    }
}

/// Render arguments the way a shell user would type them
pub fn display_args(args: &[&str]) -> String {
    args.iter()
        .map(|arg| {
            if arg.contains(char::is_whitespace) {
                format!("{arg:?}")
            } else {
                (*arg).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs real processes in a working directory
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cwd: PathBuf,
}

impl ProcessRunner {
    /// Create a runner rooted at `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    async fn run(&self, tool: Tool, args: &[&str]) -> Result<String> {
        let rendered = display_args(args);
        debug!(program = tool.program(), args = %rendered, "exec");

        let output = Command::new(tool.program())
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            return Ok(stdout.trim().to_string());
        }

        let combined = format!("{}\n{}", stdout.trim(), stderr.trim())
            .trim()
            .to_string();
        let code = output.status.code().unwrap_or(-1);
        debug!(program = tool.program(), code, output = %combined, "exec failed");

        let combined = format!("exit code {code}\n{combined}");
        Err(match tool {
            Tool::Git => Error::Vcs {
                command: rendered,
                output: combined,
            },
            Tool::Gh => Error::Forge {
                command: rendered,
                output: combined,
            },
        })
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run_git(&self, args: &[&str]) -> Result<String> {
        self.run(Tool::Git, args).await
    }

    async fn run_gh(&self, args: &[&str]) -> Result<String> {
        self.run(Tool::Gh, args).await
    }
}

/// Pushes the stack and opens PRs before landing
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Push every commit and create or update its PR
    async fn submit(&self) -> Result<()>;
}

/// Runs an external submit command with the terminal attached
#[derive(Debug, Clone)]
pub struct CommandSubmitter {
    command: Vec<String>,
    cwd: Option<PathBuf>,
}

impl Default for CommandSubmitter {
    fn default() -> Self {
        Self::new(vec!["git".to_string(), "pr".to_string()])
    }
}

impl CommandSubmitter {
    /// Submitter running `command` (program first)
    pub const fn new(command: Vec<String>) -> Self {
        Self { command, cwd: None }
    }

    /// Run in `cwd` instead of the process working directory
    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl Submitter for CommandSubmitter {
    async fn submit(&self) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(Error::Config("submit command is empty".to_string()));
        };
        debug!(program = %program, args = ?args, "running submit command");

        let mut command = Command::new(program);
        command.args(args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        let status = command.status().await?;
        if status.success() {
            return Ok(());
        }
        Err(Error::Vcs {
            command: self.command.join(" "),
            output: format!("exit code {}", status.code().unwrap_or(-1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_args_quotes_whitespace() {
        assert_eq!(
            display_args(&["pr", "merge", "1", "--subject", "Add feature (#1)"]),
            "pr merge 1 --subject \"Add feature (#1)\""
        );
    }

    #[tokio::test]
    async fn test_empty_submit_command_is_config_error() {
        let err = CommandSubmitter::new(Vec::new()).submit().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_process_runner_reports_failure_as_vcs_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path());
        // Not a repository, so rev-parse fails (or git is absent: Io error)
        match runner.run_git(&["rev-parse", "--verify", "HEAD"]).await {
            Err(Error::Vcs { command, .. }) => assert_eq!(command, "rev-parse --verify HEAD"),
            Err(Error::Io(_)) => {}
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
