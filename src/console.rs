//! User interaction surface. The core talks to the terminal only through
//! [`Console`].

use colored::Colorize;
use dialoguer::{Confirm, Input};

use crate::error::Result;

pub trait Console {
    /// Transient progress, e.g. while waiting for provisioning.
    fn progress(&self, message: &str);
    fn info(&self, message: &str);
    fn success(&self, message: &str);
    fn confirm(&self, prompt: &str) -> Result<bool>;
    fn prompt_int(&self, prompt: &str) -> Result<i64>;
}

pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn progress(&self, message: &str) {
        println!("{}", message.cyan());
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", message.green());
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(true).interact()?)
    }

    fn prompt_int(&self, prompt: &str) -> Result<i64> {
        Ok(Input::<i64>::new().with_prompt(prompt).interact_text()?)
    }
}

/// Prints a failure the way every command reports it.
pub fn print_error(message: &str) {
    eprintln!("{}", format!("ERROR: {}", message).red());
}
