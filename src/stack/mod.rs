//! Stack model
//!
//! A stack is the linear chain of commits between trunk and the current
//! position, oldest first. Each commit may carry a `Remote-Ref` trailer naming
//! the branch that holds it on the forge, and a resolved PR number.

mod parse;

pub use parse::parse_log;

use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::git::Git;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Trailer key naming the commit's remote branch
pub const KEY_REMOTE_REF: &str = "remote-ref";

/// Trailer key holding comma-separated tags
pub const KEY_TAGS: &str = "tags";

/// `key: value` trailers; keys are case-insensitive and unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailers(Vec<(String, String)>);

impl Trailers {
    /// Value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Insert unless `key` is already present (first writer wins)
    pub(crate) fn insert_if_absent(&mut self, key: &str, value: &str) {
        if self.get(key).is_none() {
            self.set(key, value);
        }
    }

    /// Number of trailers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no trailers
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(key, value)` pairs with lowercase keys
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One stack entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author date, when git printed a recognizable one
    pub date: Option<DateTime<Utc>>,
    /// First line of the message
    pub title: String,
    /// Message body without title and trailers
    pub body: String,
    /// Trailers
    pub trailers: Trailers,
    /// Resolved PR number (0 = unknown)
    pub pr_number: u64,
    /// Excluded from push and land
    pub skip: bool,
}

impl Commit {
    /// First 8 characters of the hash
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(8)]
    }

    /// Remote branch carrying this commit
    pub fn remote_ref(&self) -> Option<&str> {
        self.trailers
            .get(KEY_REMOTE_REF)
            .filter(|r| !r.is_empty())
    }

    /// Tags from the `tags` trailer, after `defaults`, without duplicates
    pub fn tags(&self, defaults: &[&str]) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let raw = self.trailers.get(KEY_TAGS).unwrap_or_default();
        for tag in defaults.iter().copied().chain(raw.split(',')) {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }

    /// Commit message with aligned `Title-Case` trailers, `Remote-Ref` last
    pub fn full_message(&self) -> String {
        let mut trailers: Vec<(&str, &str)> = self.trailers.iter().collect();
        trailers.sort_by(|(a, _), (b, _)| {
            (*a == KEY_REMOTE_REF)
                .cmp(&(*b == KEY_REMOTE_REF))
                .then_with(|| a.cmp(b))
        });
        let width = trailers.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        let mut out = format!("{}\n\n{}\n\n", self.title, self.body);
        for (key, value) in trailers {
            out.push_str(&format!("{:>width$}: {value}\n", title_case_key(key)));
        }
        out.trim().to_string()
    }

    /// Whether `hash` (at least 8 chars) and this commit's hash share a prefix
    pub fn matches_hash(&self, hash: &str) -> bool {
        hash.len() >= 8 && (self.hash.starts_with(hash) || hash.starts_with(&self.hash))
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_ref() {
            Some(remote_ref) => write!(f, "{} ({remote_ref}) {}", self.short_hash(), self.title),
            None => write!(f, "{} {}", self.short_hash(), self.title),
        }
    }
}

/// `remote-ref` -> `Remote-Ref`
fn title_case_key(key: &str) -> String {
    key.to_ascii_lowercase()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Ordered commits, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    commits: Vec<Commit>,
}

impl Stack {
    /// Wrap commits that are already oldest first
    pub fn new(commits: Vec<Commit>) -> Self {
        Self { commits }
    }

    /// All commits including skipped ones
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Commits that take part in push and land
    pub fn active(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(|c| !c.skip)
    }

    /// Mutable access for PR number resolution
    pub fn commits_mut(&mut self) -> &mut [Commit] {
        &mut self.commits
    }

    /// Number of commits including skipped ones
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the stack has no commits
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Commit whose hash shares a prefix with `hash`
    pub fn by_hash(&self, hash: &str) -> Option<&Commit> {
        self.commits.iter().find(|c| c.matches_hash(hash))
    }

    /// Commit carrying `remote_ref`
    pub fn by_remote_ref(&self, remote_ref: &str) -> Option<&Commit> {
        self.active().find(|c| c.remote_ref() == Some(remote_ref))
    }

    /// Fail if two active commits share a remote-ref
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<&str, &Commit> = HashMap::new();
        for commit in self.active() {
            let Some(remote_ref) = commit.remote_ref() else {
                continue;
            };
            if let Some(previous) = seen.insert(remote_ref, commit) {
                return Err(Error::Validation(format!(
                    "commits {} and {} share remote-ref {remote_ref}",
                    previous.short_hash(),
                    commit.short_hash()
                )));
            }
        }
        Ok(())
    }
}

/// Whose commits to keep active
#[derive(Debug, Clone, Default)]
pub struct AuthorFilter {
    /// Email of the operator; `None` keeps everyone
    pub email: Option<String>,
}

impl AuthorFilter {
    /// Keep only commits authored by `email`
    pub fn only(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    /// Keep every author
    pub const fn everyone() -> Self {
        Self { email: None }
    }

    /// Operator's commits only, unless the repo allows every author
    ///
    /// An unknown operator email keeps everyone.
    pub fn for_repo(repo: &RepoConfig) -> Self {
        if repo.include_other_authors || repo.email.is_empty() {
            Self::everyone()
        } else {
            Self::only(&repo.email)
        }
    }

    fn excludes(&self, commit: &Commit) -> bool {
        self.email
            .as_deref()
            .is_some_and(|email| !commit.author_email.eq_ignore_ascii_case(email))
    }
}

/// Read the stack between `base` and `target`, oldest first
///
/// Empty commits and commits excluded by `authors` are marked `skip`. Fails
/// with a validation error if two active commits share a remote-ref.
pub async fn stacked_commits(
    git: &Git,
    base: &str,
    target: &str,
    authors: &AuthorFilter,
) -> Result<Stack> {
    let log = git.log(base, target).await?;
    let mut commits = parse_log(&log)?;
    commits.reverse();

    for commit in &mut commits {
        if authors.excludes(commit) {
            debug!(hash = commit.short_hash(), author = %commit.author_email, "skipping commit by other author");
            commit.skip = true;
        } else if is_empty(git, &commit.hash).await? {
            debug!(hash = commit.short_hash(), "skipping empty commit");
            commit.skip = true;
        }
    }

    let stack = Stack::new(commits);
    stack.validate()?;
    debug!(base, target, count = stack.len(), "read stack");
    Ok(stack)
}

/// Whether `hash` changes no files
pub async fn is_empty(git: &Git, hash: &str) -> Result<bool> {
    git.is_empty_commit(hash).await
}
