//! Terminal-backed prompts.
//!
//! Hidden input through dialoguer when stdin is a terminal. Piped input is
//! read one line at a time, so scripts can feed passphrases and answers.

use std::io::{self, BufRead, IsTerminal};

use dialoguer::{Confirm as ConfirmPrompt, Password};
use zeroize::Zeroizing;

use crate::core::prompt::{Confirm, SecretPrompt};
use crate::error::Result;

/// Prompts on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl Terminal {
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// One line from stdin without its line ending. `None` at EOF.
    fn read_line() -> Result<Option<Zeroizing<String>>> {
        let mut line = Zeroizing::new(String::new());
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(&['\r', '\n'][..]).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Ask for a new passphrase twice. Empty means no passphrase.
    pub fn new_passphrase(&self) -> Result<Option<Zeroizing<String>>> {
        let passphrase = if Self::is_interactive() {
            Zeroizing::new(
                Password::new()
                    .with_prompt("Passphrase (empty for none)")
                    .with_confirmation("Confirm passphrase", "passphrases do not match")
                    .allow_empty_password(true)
                    .interact()?,
            )
        } else {
            Self::read_line()?.unwrap_or_default()
        };
        Ok(Some(passphrase).filter(|p| !p.is_empty()))
    }
}

impl SecretPrompt for Terminal {
    fn read_secret(&self, prompt: &str) -> Result<Zeroizing<String>> {
        if Self::is_interactive() {
            let secret = Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()?;
            return Ok(Zeroizing::new(secret));
        }
        Ok(Self::read_line()?.unwrap_or_default())
    }
}

impl Confirm for Terminal {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if Self::is_interactive() {
            let answer = ConfirmPrompt::new()
                .with_prompt(prompt)
                .default(false)
                .interact()?;
            return Ok(answer);
        }

        eprintln!("{} [y/N]", prompt);
        Ok(Self::read_line()?
            .map(|line| matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false))
    }
}
