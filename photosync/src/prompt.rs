//! Interactive questions, kept behind a trait so configuration, sign-in and
//! removal can be driven by scripted answers in tests.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password, Select};
use tracing::warn;

use crate::sync::LocalEntry;

pub trait Prompter {
    fn input(&mut self, prompt: &str) -> Result<String>;

    fn password(&mut self, prompt: &str) -> Result<String>;

    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .context("failed to read input")
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .context("failed to read password")
    }

    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .context("failed to read selection")
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("failed to read confirmation")
    }
}

/// Shows the removal candidates and asks once whether to delete them.
///
/// `assume_yes` answers for the user but the list is still printed. A prompt
/// that cannot be answered counts as "no".
pub fn confirm_removal(
    prompter: &mut dyn Prompter,
    candidates: &[LocalEntry],
    assume_yes: bool,
) -> bool {
    println!("Missing photos ({}):", candidates.len());
    for entry in candidates {
        println!("\t{}", entry.name);
    }

    if assume_yes {
        println!("Proceeding with removal (--yes)");
        return true;
    }

    match prompter.confirm("Proceed with removal?", false) {
        Ok(answer) => answer,
        Err(err) => {
            warn!("removal not confirmed: {err:#}");
            false
        }
    }
}
