//! Interactive capabilities injected into core operations.
//!
//! Core code never touches terminal state; callers hand in implementations
//! of these traits (the CLI uses a terminal-backed one, tests use scripted
//! ones).

use zeroize::Zeroizing;

use crate::error::Result;

/// Reads a secret, such as a passphrase, without keeping it around.
pub trait SecretPrompt {
    fn read_secret(&self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// Asks a yes/no question. Absent input must count as "no".
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// A prompt that answers every question with a fixed value.
#[derive(Debug, Clone, Default)]
pub struct Fixed {
    pub answer: bool,
    pub secret: Option<String>,
}

impl Fixed {
    /// Answers "no" and has no secret to give.
    pub fn decline() -> Self {
        Self::default()
    }

    /// Answers "yes".
    pub fn accept() -> Self {
        Self {
            answer: true,
            secret: None,
        }
    }

    /// Returns `secret` for every secret prompt.
    pub fn secret(secret: impl Into<String>) -> Self {
        Self {
            answer: false,
            secret: Some(secret.into()),
        }
    }
}

impl SecretPrompt for Fixed {
    fn read_secret(&self, _prompt: &str) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(self.secret.clone().unwrap_or_default()))
    }
}

impl Confirm for Fixed {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.answer)
    }
}
