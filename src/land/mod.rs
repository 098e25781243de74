//! Landing: merge a stack of PRs one at a time
//!
//! - [`preflight`](Lander::preflight) checks the checkout and builds a [`LandingPlan`]
//! - [`Lander::land`] runs every PR through the landing states in order
//! - [`cleanup_body`] turns a PR description into a squash-commit body

mod body;
mod engine;
mod plan;
mod poll;
mod preflight;
mod progress;
mod prompt;
mod recovery;

pub use body::cleanup_body;
pub use engine::{LandReport, Lander};
pub use plan::{LandingPlan, PrInfo, build_plan};
pub use poll::{Poll, Polled, Poller};
pub use preflight::Preflight;
pub use progress::{LandingState, NoopProgress, ProgressCallback, StepOutcome};
pub use prompt::{NoPrompter, Prompter};
pub use recovery::{rebase_remaining, recovery_commands};
