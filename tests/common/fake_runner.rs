//! Fake command runner for testing
//!
//! Records every git and gh invocation and answers from scripted rules, so
//! the real `Git` and `GitHubService` adapters run against it unchanged.

#![allow(dead_code)]

use async_trait::async_trait;
use git_pr::error::{Error, Result};
use git_pr::exec::{CommandRunner, Tool, display_args};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl Invocation {
    /// Arguments joined by spaces
    pub fn line(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Ok(String),
    Fail(String),
}

struct Rule {
    tool: Tool,
    prefix: Vec<String>,
    replies: VecDeque<Reply>,
}

impl Rule {
    fn matches(&self, tool: Tool, args: &[&str]) -> bool {
        self.tool == tool
            && self.prefix.len() <= args.len()
            && self.prefix.iter().zip(args).all(|(p, a)| p.as_str() == *a)
    }

    /// Queued replies are consumed in order; the last one sticks
    fn next_reply(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap_or(Reply::Ok(String::new()))
        } else {
            self.replies
                .front()
                .cloned()
                .unwrap_or(Reply::Ok(String::new()))
        }
    }
}

/// Scripted `CommandRunner`
///
/// The rule with the longest matching argument prefix answers. Unscripted
/// git calls succeed with empty output; unscripted gh calls fail.
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, tool: Tool, prefix: &[&str], reply: Reply) {
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules
            .iter_mut()
            .find(|r| r.tool == tool && r.prefix.iter().map(String::as_str).eq(prefix.iter().copied()))
        {
            rule.replies.push_back(reply);
            return;
        }
        rules.push(Rule {
            tool,
            prefix: prefix.iter().map(ToString::to_string).collect(),
            replies: VecDeque::from([reply]),
        });
    }

    // === Scripting ===

    /// Answer git calls starting with `prefix` with `output`
    pub fn git_ok(&self, prefix: &[&str], output: &str) {
        self.script(Tool::Git, prefix, Reply::Ok(output.to_string()));
    }

    /// Fail git calls starting with `prefix`, with `output` as captured stderr
    pub fn git_err(&self, prefix: &[&str], output: &str) {
        self.script(Tool::Git, prefix, Reply::Fail(output.to_string()));
    }

    /// Answer gh calls starting with `prefix` with `output`
    pub fn gh_ok(&self, prefix: &[&str], output: &str) {
        self.script(Tool::Gh, prefix, Reply::Ok(output.to_string()));
    }

    /// Fail gh calls starting with `prefix`, with `output` as captured stderr
    pub fn gh_err(&self, prefix: &[&str], output: &str) {
        self.script(Tool::Gh, prefix, Reply::Fail(output.to_string()));
    }

    // === Call tracking ===

    /// Every invocation, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    fn lines(&self, tool: Tool) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.tool == tool)
            .map(Invocation::line)
            .collect()
    }

    /// Argument following `flag` in the first gh call starting with `prefix`
    pub fn gh_flag_value(&self, prefix: &str, flag: &str) -> Option<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.tool == Tool::Gh && c.line().starts_with(prefix))
            .find_map(|c| {
                let at = c.args.iter().position(|a| a == flag)?;
                c.args.get(at + 1).cloned()
            })
    }

    /// gh invocations as argument lines
    pub fn gh_calls(&self) -> Vec<String> {
        self.lines(Tool::Gh)
    }

    /// git invocations as argument lines
    pub fn git_calls(&self) -> Vec<String> {
        self.lines(Tool::Git)
    }

    /// gh invocations starting with `prefix`
    pub fn gh_calls_starting(&self, prefix: &str) -> Vec<String> {
        self.gh_calls()
            .into_iter()
            .filter(|line| line.starts_with(prefix))
            .collect()
    }

    /// Whether a gh invocation starting with `prefix` was made
    pub fn ran_gh(&self, prefix: &str) -> bool {
        !self.gh_calls_starting(prefix).is_empty()
    }

    /// Whether a git invocation starting with `prefix` was made
    pub fn ran_git(&self, prefix: &str) -> bool {
        self.git_calls().iter().any(|line| line.starts_with(prefix))
    }

    /// PR numbers passed to `gh pr merge`, in order
    pub fn merged_numbers(&self) -> Vec<u64> {
        self.gh_calls_starting("pr merge ")
            .iter()
            .filter_map(|line| line.split(' ').nth(2)?.parse().ok())
            .collect()
    }

    // === GitHub shortcuts ===

    /// `gh pr view N --json mergeable,mergeStateStatus`
    pub fn pr_mergeability(&self, number: u64, mergeable: &str, merge_state: &str) {
        let number = number.to_string();
        self.gh_ok(
            &["pr", "view", &number, "--json", "mergeable,mergeStateStatus"],
            &format!(r#"{{"mergeable":"{mergeable}","mergeStateStatus":"{merge_state}"}}"#),
        );
    }

    /// `gh pr view N --json headRefOid`
    pub fn pr_head(&self, number: u64, sha: &str) {
        let number = number.to_string();
        self.gh_ok(
            &["pr", "view", &number, "--json", "headRefOid"],
            &format!(r#"{{"headRefOid":"{sha}"}}"#),
        );
    }

    /// `gh pr view N --json body`
    pub fn pr_body(&self, number: u64, body: &str) {
        let number = number.to_string();
        let body = serde_json::json!({ "body": body }).to_string();
        self.gh_ok(&["pr", "view", &number, "--json", "body"], &body);
    }

    /// `gh pr checks N ...` answering with a JSON array
    pub fn pr_checks(&self, number: u64, json: &str) {
        let number = number.to_string();
        self.gh_ok(&["pr", "checks", &number], json);
    }

    /// `gh pr view N --json state,mergeStateStatus`
    pub fn pr_progress(&self, number: u64, state: &str) {
        let number = number.to_string();
        self.gh_ok(
            &["pr", "view", &number, "--json", "state,mergeStateStatus"],
            &format!(r#"{{"state":"{state}","mergeStateStatus":"UNKNOWN"}}"#),
        );
    }

    /// `gh pr merge N` succeeds
    pub fn pr_merge_ok(&self, number: u64) {
        let number = number.to_string();
        self.gh_ok(&["pr", "merge", &number], "");
    }

    /// `gh pr edit N` succeeds
    pub fn pr_edit_ok(&self, number: u64) {
        let number = number.to_string();
        self.gh_ok(&["pr", "edit", &number], "");
    }

    /// Everything a clean, checks-free PR needs to land
    pub fn ready_pr(&self, number: u64) {
        self.pr_mergeability(number, "MERGEABLE", "CLEAN");
        self.pr_head(number, &super::sha_for(number));
        self.pr_body(number, &format!("Body of change {number}"));
        self.pr_checks(number, "[]");
        self.pr_merge_ok(number);
        self.pr_edit_ok(number);
    }

    fn answer(&self, tool: Tool, args: &[&str]) -> Result<String> {
        self.calls.lock().unwrap().push(Invocation {
            tool,
            args: args.iter().map(ToString::to_string).collect(),
        });

        let reply = {
            let mut rules = self.rules.lock().unwrap();
            rules
                .iter_mut()
                .filter(|r| r.matches(tool, args))
                .max_by_key(|r| r.prefix.len())
                .map(Rule::next_reply)
        };

        let command = display_args(args);
        match (tool, reply) {
            (_, Some(Reply::Ok(output))) => Ok(output),
            (Tool::Git, Some(Reply::Fail(output))) => Err(Error::Vcs { command, output }),
            (Tool::Gh, Some(Reply::Fail(output))) => Err(Error::Forge { command, output }),
            (Tool::Git, None) => Ok(String::new()),
            (Tool::Gh, None) => Err(Error::Forge {
                command,
                output: "no fake response".to_string(),
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run_git(&self, args: &[&str]) -> Result<String> {
        self.answer(Tool::Git, args)
    }

    async fn run_gh(&self, args: &[&str]) -> Result<String> {
        self.answer(Tool::Gh, args)
    }
}
