//! Terminal prompts

use dialoguer::{Confirm, Input};
use git_pr::error::{Error, Result};
use git_pr::land::Prompter;

/// Prompts on the attached terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Internal(format!("Failed to read input: {e}")))
    }
}
