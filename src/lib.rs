//! git-pr: land stacked GitHub pull requests
//!
//! A stack is a chain of commits on top of trunk, each carried by its own
//! branch and PR (linked through a `Remote-Ref` trailer). Landing merges the
//! PRs bottom-up, one at a time, repointing each next PR at trunk and
//! rebasing the rest of the stack when that causes conflicts.
//!
//! All git and GitHub access goes through [`exec::CommandRunner`], which runs
//! `git` and the `gh` CLI.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod exec;
pub mod git;
pub mod land;
pub mod platform;
pub mod stack;
pub mod status;
pub mod types;

pub use config::{LandConfig, MergeStrategy, RepoConfig, SyncPolicy};
pub use error::{Error, Result};
pub use land::{LandReport, Lander, LandingPlan, Preflight};
