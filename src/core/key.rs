//! Key domain types.
//!
//! Describes what a provider is asked to generate and what it reports back
//! about key material.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::core::constants;
use crate::core::project;
use crate::error::{Result, ValidationError};

/// RSA modulus sizes offered at generation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum KeySize {
    Rsa2048,
    Rsa3072,
    #[default]
    Rsa4096,
}

impl KeySize {
    pub fn bits(self) -> u32 {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
        }
    }
}

impl TryFrom<u32> for KeySize {
    type Error = crate::error::Error;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            other => Err(ValidationError::InvalidKeySize(other).into()),
        }
    }
}

/// Key algorithm family.
///
/// The elliptic-curve family always uses Curve25519.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Algorithm {
    Rsa(KeySize),
    Ecc,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa(size) => write!(f, "rsa{}", size.bits()),
            Self::Ecc => write!(f, "ecc (curve25519)"),
        }
    }
}

/// Parameters for generating a project key.
pub struct KeyRequest {
    /// Human name, e.g. `"Demo Project Key"`
    pub name: String,
    pub email: String,
    pub algorithm: Algorithm,
    /// Empty or absent means an unprotected private key
    pub passphrase: Option<Zeroizing<String>>,
}

impl KeyRequest {
    /// Request with the synthesized identity for `project_name`.
    ///
    /// `"<name> Project Key" <project+<slug>@team.org>`
    pub fn for_project(project_name: &str, algorithm: Algorithm) -> Self {
        Self {
            name: format!("{} Project Key", project_name),
            email: format!(
                "project+{}@{}",
                project::slug(Some(project_name)),
                constants::IDENTITY_DOMAIN
            ),
            algorithm,
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: Option<Zeroizing<String>>) -> Self {
        self.passphrase = passphrase.filter(|p| !p.is_empty());
        self
    }

    /// `Name <email>` user id.
    pub fn uid(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|p| p.as_str())
    }
}

/// What a provider knows about a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    /// Short identifier for display and config
    pub key_id: String,
    /// Full fingerprint, used for every destructive operation
    pub fingerprint: String,
    /// `Name <email>`
    pub uid: String,
    pub created: Option<DateTime<Utc>>,
    /// Material includes the private half
    pub secret: bool,
    /// Private half is passphrase-protected
    pub protected: bool,
}

impl KeyInfo {
    /// Name part of the user id.
    pub fn name(&self) -> &str {
        match self.uid.find('<') {
            Some(idx) => self.uid[..idx].trim(),
            None => self.uid.trim(),
        }
    }

    /// Email part of the user id, if present.
    pub fn email(&self) -> Option<&str> {
        let start = self.uid.find('<')?;
        let end = self.uid[start..].find('>')? + start;
        Some(&self.uid[start + 1..end])
    }
}

/// Armored key pair as produced by a provider.
pub struct KeyMaterial {
    pub info: KeyInfo,
    pub public: String,
    pub private: Zeroizing<String>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("info", &self.info)
            .field("public_len", &self.public.len())
            .field("private", &"<redacted>")
            .finish()
    }
}

/// The project's key as stored under `.secret/`.
pub type ProjectKey = KeyMaterial;
