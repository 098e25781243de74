//! Shared test utilities

#![allow(dead_code)]

mod fake_runner;

pub use fake_runner::{FakeRunner, Invocation};

use async_trait::async_trait;
use git_pr::config::{LandConfig, RepoConfig};
use git_pr::error::{Error, Result};
use git_pr::exec::{CommandRunner, Submitter};
use git_pr::git::Git;
use git_pr::land::{Lander, LandingPlan, LandingState, PrInfo, ProgressCallback, Prompter, StepOutcome};
use git_pr::platform::GitHubService;
use git_pr::stack::{Commit, Trailers};
use git_pr::types::PrStatus;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

/// Deterministic 40-character head SHA for a PR number
pub fn sha_for(number: u64) -> String {
    format!("{number:0>40}")
}

pub fn repo_config() -> RepoConfig {
    RepoConfig {
        remote: "origin".to_string(),
        trunk: "main".to_string(),
        host: "github.com".to_string(),
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        email: "dev@example.com".to_string(),
        include_other_authors: false,
    }
}

/// Landing config without any real waiting
pub fn fast_config() -> LandConfig {
    LandConfig {
        timeout: Duration::from_secs(5),
        poll_interval: Duration::ZERO,
        settle_delay: Duration::ZERO,
        recovery_settle_delay: Duration::ZERO,
        unknown_retry_delay: Duration::ZERO,
        ..LandConfig::default()
    }
}

/// Open PR `number` on branch `feature-<number>`, based on the previous one
pub fn pr_info(number: u64, base: &str) -> PrInfo {
    let branch = format!("feature-{number}");
    let mut trailers = Trailers::default();
    trailers.set("Remote-Ref", branch.clone());
    PrInfo {
        number,
        title: format!("Change {number}"),
        url: repo_config().pr_url(number),
        head_sha: sha_for(number),
        head_branch: branch,
        base_branch: base.to_string(),
        commit: Commit {
            hash: sha_for(number),
            author_email: "dev@example.com".to_string(),
            title: format!("Change {number}"),
            trailers,
            pr_number: number,
            ..Commit::default()
        },
        status: PrStatus::default(),
    }
}

/// A linear stack of PRs; the first targets `main`
pub fn stack_plan(numbers: &[u64]) -> LandingPlan {
    let mut base = "main".to_string();
    let prs = numbers
        .iter()
        .map(|&n| {
            let pr = pr_info(n, &base);
            base.clone_from(&pr.head_branch);
            pr
        })
        .collect();
    LandingPlan::new(prs)
}

/// `git log` entry as git prints it
pub fn log_entry(hash: &str, email: &str, title: &str, remote_ref: Option<&str>) -> String {
    let mut entry = format!(
        "commit {hash}\nAuthor: Dev <{email}>\nDate:   2024-05-01T10:00:00+00:00\n\n    {title}\n"
    );
    if let Some(remote_ref) = remote_ref {
        entry.push_str(&format!("\n    Remote-Ref: {remote_ref}\n"));
    }
    entry
}

// =============================================================================
// Lander wiring
// =============================================================================

/// Lander whose git and GitHub calls all go to `runner`
pub fn lander(runner: &Arc<FakeRunner>, config: LandConfig) -> Lander {
    let runner: Arc<dyn CommandRunner> = runner.clone();
    let git = Git::new(Arc::clone(&runner), "origin");
    let platform = Arc::new(GitHubService::new(runner, repo_config()));
    Lander::new(git, platform, repo_config(), config)
}

/// Prompter answering from scripts, recording the questions
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    lines: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn with_lines(lines: &[&str]) -> Self {
        let prompter = Self::default();
        prompter
            .lines
            .lock()
            .unwrap()
            .extend(lines.iter().map(ToString::to_string));
        prompter
    }

    pub fn with_confirms(answers: &[bool]) -> Self {
        let prompter = Self::default();
        prompter.confirms.lock().unwrap().extend(answers);
        prompter
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(false))
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        self.questions.lock().unwrap().push(prompt.to_string());
        self.lines
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Cancelled("script ran out of input".to_string()))
    }
}

/// Progress callback recording events as text
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Whether any event contains `needle`
    pub fn saw(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.contains(needle))
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_pr_start(&self, index: usize, total: usize, pr: &PrInfo) {
        self.push(format!("start {}/{total} #{}", index + 1, pr.number));
    }

    async fn on_state(&self, pr_number: u64, state: LandingState) {
        self.push(format!("state #{pr_number} {state}"));
    }

    async fn on_step_start(&self, message: &str) {
        self.push(format!("step {message}"));
    }

    async fn on_step_finish(&self, outcome: StepOutcome) {
        let event = match outcome {
            StepOutcome::Done(m) => format!("done {m}"),
            StepOutcome::Warning(m) => format!("warning {m}"),
            StepOutcome::Failed(m) => format!("failed {m}"),
        };
        self.push(event);
    }

    async fn on_message(&self, message: &str) {
        self.push(format!("message {message}"));
    }
}

/// Submitter counting its runs
#[derive(Default)]
pub struct RecordingSubmitter {
    runs: AtomicUsize,
}

impl RecordingSubmitter {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
