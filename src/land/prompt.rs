//! Operator input

use crate::error::{Error, Result};

/// Source of operator decisions
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Read one line of input
    fn read_line(&self, prompt: &str) -> Result<String>;
}

/// Prompter for non-interactive runs: declines everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompter;

impl Prompter for NoPrompter {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(false)
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        Err(Error::Cancelled(format!("no terminal to answer '{prompt}'")))
    }
}
