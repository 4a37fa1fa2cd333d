//! Cryptographic primitive providers.
//!
//! A provider owns a key store and performs the actual cryptographic work.
//! Everything above this module is provider-agnostic.
//!
//! ## Providers
//!
//! - **gpg**: default. Drives the installed `gpg` binary and its keyring.
//! - **age**: embedded. Uses the `age` crate with x25519 keys and keeps its
//!   own key store directory.
//!
//! ## Adding a New Provider
//!
//! 1. Implement the `Provider` trait in a new file
//! 2. Register its identifier in `from_backend`

use crate::core::config::ProjectConfig;
use crate::core::key::{KeyInfo, KeyMaterial, KeyRequest};
use crate::error::{ConfigError, Result};

pub mod age;
pub mod gpg;

pub use self::age::Age;
pub use self::gpg::Gpg;

/// Capability set every provider implements.
///
/// Keys are addressed by short identifier only in [`Provider::lookup`];
/// everything that changes or uses a key takes the full fingerprint.
pub trait Provider {
    /// Backend identifier stored in the config.
    fn name(&self) -> &'static str;

    /// Suffix appended to a plaintext path to name its ciphertext.
    fn suffix(&self) -> &'static str;

    /// Generate a key pair in the store and return its armored halves.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Generation` when the primitive fails, or
    /// `ValidationError::UnsupportedAlgorithm` for an algorithm the
    /// provider cannot produce.
    fn generate(&self, request: &KeyRequest) -> Result<KeyMaterial>;

    /// Decode armored key material without installing it.
    ///
    /// The returned `reason` of the error is suitable for
    /// `ValidationError::InvalidKeyMaterial`.
    fn inspect(&self, armored: &str) -> std::result::Result<KeyInfo, String>;

    /// Add a validated key pair to the store.
    fn install(&self, material: &KeyMaterial, passphrase: Option<&str>) -> Result<()>;

    /// Human-readable listing of every secret key in the store.
    fn list_secret_keys(&self) -> Result<String>;

    /// Resolve a short identifier (or fingerprint) to a key in the store.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::FingerprintNotFound` when nothing matches.
    fn lookup(&self, key_id: &str) -> Result<KeyInfo>;

    /// Remove both halves of a key from the store.
    fn delete(&self, fingerprint: &str) -> Result<()>;

    /// Manual command that performs [`Provider::delete`].
    fn delete_hint(&self, fingerprint: &str) -> String;

    /// Encrypt to the public half of `fingerprint`.
    fn encrypt(&self, fingerprint: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt with the private half of `fingerprint`.
    fn decrypt(
        &self,
        fingerprint: &str,
        ciphertext: &[u8],
        passphrase: Option<&str>,
    ) -> Result<Vec<u8>>;
}

/// Provider for a backend identifier.
pub fn from_backend(backend: &str) -> Result<Box<dyn Provider>> {
    match backend {
        "gpg" => Ok(Box::new(Gpg::new())),
        "age" => Ok(Box::new(Age::new()?)),
        other => Err(ConfigError::UnknownBackend(other.to_string()).into()),
    }
}

/// Provider configured for a project.
pub fn from_config(config: &ProjectConfig) -> Result<Box<dyn Provider>> {
    from_backend(config.backend.trim())
}
