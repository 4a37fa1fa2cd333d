//! Error types.
//!
//! One crate-level [`Error`] wraps a per-domain enum for each failure family.
//! Every variant renders a user-facing message; [`Error::hint`] adds the next
//! step to take when the automated path cannot recover on its own.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Example(#[from] ExampleError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Project configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("project not initialized: .secret/config.yaml not found")]
    NotInitialized,

    #[error("project already has an active key: {0}")]
    AlreadyInitialized(String),

    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),

    #[error("unknown backend: {0} (supported: gpg, age)")]
    UnknownBackend(String),

    #[error("invalid secret file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Key lifecycle failures: generation, import, export and deletion.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    Generation(String),

    #[error("failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no active key configured for this project")]
    NoActiveKey,

    #[error("key {0} no longer exists in the key store")]
    KeyNotFound(String),

    #[error("key files not found: searched '{}' for files with prefix '{prefix}'", .dir.display())]
    KeyFilesNotFound { dir: PathBuf, prefix: String },

    #[error("a different key is already active ({0})")]
    ActiveKeyExists(String),

    #[error("key store operation failed: {0}")]
    Store(String),

    #[error("failed to delete key {fingerprint}: {reason}")]
    DeleteFailed {
        fingerprint: String,
        reason: String,
        remediation: String,
    },
}

/// Malformed or inconsistent input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid key material in {}: {reason}", .path.display())]
    InvalidKeyMaterial { path: PathBuf, reason: String },

    #[error("public key {public} does not belong to private key {private}")]
    KeyPairMismatch { public: String, private: String },

    #[error("{backend} backend does not support {algorithm} keys")]
    UnsupportedAlgorithm {
        backend: &'static str,
        algorithm: String,
    },

    #[error("invalid RSA key size {0} (expected 2048, 3072 or 4096)")]
    InvalidKeySize(u32),
}

/// Encryption and decryption failures for a single file.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("no key configured for this project")]
    NoKeyConfigured,

    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{} is not a {suffix} file", .path.display())]
    NotCiphertext { path: PathBuf, suffix: &'static str },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Example file generation failures.
#[derive(Error, Debug)]
pub enum ExampleError {
    #[error("failed to read {} for example generation: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write example file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key identity resolution failures.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no fingerprint found for key {0}")]
    FingerprintNotFound(String),

    #[error("key id {key_id} is ambiguous: {count} keys match")]
    Ambiguous { key_id: String, count: usize },

    #[error("could not detect a key for project '{0}'")]
    ProjectKeyNotDetected(String),

    #[error("{0}")]
    ProviderUnavailable(String),
}

impl Error {
    /// Next step to suggest to the user, if one exists.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Config(ConfigError::NotInitialized) => Some("run: secret init".to_string()),
            Self::Config(ConfigError::AlreadyInitialized(_)) => {
                Some("run: secret init --force (export the current key first)".to_string())
            }
            Self::Key(KeyError::NoActiveKey) | Self::Crypto(CryptoError::NoKeyConfigured) => {
                Some("run: secret init, or secret import <directory>".to_string())
            }
            Self::Key(KeyError::KeyNotFound(_)) => {
                Some("the stale key reference was cleared; run: secret import".to_string())
            }
            Self::Key(KeyError::KeyFilesNotFound { .. }) => {
                Some("run: secret import <directory-with-keys>".to_string())
            }
            Self::Key(KeyError::ActiveKeyExists(_)) => {
                Some("re-run with --force to replace the active key".to_string())
            }
            Self::Key(KeyError::DeleteFailed { remediation, .. }) => {
                Some(format!("delete it manually: {}", remediation))
            }
            Self::Lookup(LookupError::FingerprintNotFound(_) | LookupError::Ambiguous { .. }) => {
                Some("pass an explicit key with --key <id>, or run: secret check --all".to_string())
            }
            Self::Lookup(LookupError::ProjectKeyNotDetected(_)) => Some(
                "run: secret init, secret import, or inspect keys with: secret check --all"
                    .to_string(),
            ),
            _ => None,
        }
    }
}
