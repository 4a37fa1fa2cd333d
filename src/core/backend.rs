//! Encryption backend.
//!
//! Turns secret files into ciphertext siblings and back, using the project's
//! active key. Encrypting also refreshes the file's redacted example.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::config::ProjectConfig;
use crate::core::example;
use crate::core::key::KeyInfo;
use crate::core::project::Project;
use crate::core::prompt::SecretPrompt;
use crate::core::provider::Provider;
use crate::error::{ConfigError, CryptoError, Error, Result};

/// Files written by a successful encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encrypted {
    pub ciphertext: PathBuf,
    pub example: PathBuf,
}

/// Result of processing one file in batch mode.
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    /// Written output path
    pub outcome: Result<PathBuf>,
    /// Non-fatal problem, e.g. an example file that couldn't be written
    pub warning: Option<String>,
}

/// Outcome of a batch run. Per-file failures never abort the batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<FileResult>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.warning.as_deref().map(|w| (r.path.as_path(), w)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.path.as_path(), e)))
    }
}

/// Encrypts and decrypts files with the project's key.
pub struct EncryptionBackend<'a> {
    project: &'a Project,
    provider: &'a dyn Provider,
    config: &'a ProjectConfig,
    key_override: Option<&'a str>,
}

impl<'a> EncryptionBackend<'a> {
    pub fn new(
        project: &'a Project,
        provider: &'a dyn Provider,
        config: &'a ProjectConfig,
        key_override: Option<&'a str>,
    ) -> Self {
        Self {
            project,
            provider,
            config,
            key_override,
        }
    }

    /// Ciphertext suffix of the provider in use.
    pub fn suffix(&self) -> &'static str {
        self.provider.suffix()
    }

    fn key_id(&self) -> Result<&str> {
        self.key_override
            .filter(|id| !id.trim().is_empty())
            .or(self.config.active_key_id())
            .ok_or_else(|| CryptoError::NoKeyConfigured.into())
    }

    /// The key every operation encrypts to, resolved to its fingerprint.
    pub fn key(&self) -> Result<KeyInfo> {
        self.provider.lookup(self.key_id()?)
    }

    /// Encrypt `path` to `path + suffix`, then write its example file.
    ///
    /// # Errors
    ///
    /// - `CryptoError::NoKeyConfigured` if no key is configured
    /// - `CryptoError::MissingFile` if `path` doesn't exist
    /// - `Error::Example` if only the example file failed; the ciphertext
    ///   is kept
    pub fn encrypt(&self, path: &Path) -> Result<Encrypted> {
        let key_id = self.key_id()?;
        let path = self.project.resolve(path);
        if !path.exists() {
            return Err(CryptoError::MissingFile(path).into());
        }

        let key = self.provider.lookup(key_id)?;
        let plaintext = fs::read(&path)?;
        debug!(path = %path.display(), key = %key.key_id, "encrypting file");

        let ciphertext = self.provider.encrypt(&key.fingerprint, &plaintext)?;
        let output = with_suffix(&path, self.suffix());
        fs::write(&output, ciphertext)?;
        info!(output = %output.display(), "encrypted");

        let example = example::generate(&path)?;
        Ok(Encrypted {
            ciphertext: output,
            example,
        })
    }

    /// Decrypt `path` to the same path without its ciphertext suffix.
    ///
    /// The passphrase is requested from `prompt` only when the stored private
    /// key is protected, and is dropped when the call returns.
    ///
    /// # Errors
    ///
    /// - `CryptoError::NotCiphertext` if `path` lacks the provider suffix
    /// - `CryptoError::MissingFile` if `path` doesn't exist
    /// - `CryptoError::DecryptionFailed` on a wrong passphrase or missing key
    pub fn decrypt(&self, path: &Path, prompt: &dyn SecretPrompt) -> Result<PathBuf> {
        let key_id = self.key_id()?;
        let path = self.project.resolve(path);
        let output =
            strip_suffix(&path, self.suffix()).ok_or_else(|| CryptoError::NotCiphertext {
                path: path.clone(),
                suffix: self.suffix(),
            })?;
        if !path.exists() {
            return Err(CryptoError::MissingFile(path).into());
        }

        let key = self.provider.lookup(key_id)?;
        let ciphertext = fs::read(&path)?;
        debug!(path = %path.display(), key = %key.key_id, "decrypting file");

        let passphrase = if self.is_protected(&key) {
            Some(prompt.read_secret(&format!("Passphrase for key {}", key.key_id))?)
        } else {
            None
        };

        let plaintext = self.provider.decrypt(
            &key.fingerprint,
            &ciphertext,
            passphrase.as_ref().map(|p| p.as_str()),
        )?;
        fs::write(&output, plaintext)?;
        info!(output = %output.display(), "decrypted");

        Ok(output)
    }

    /// Whether decrypting needs a passphrase.
    fn is_protected(&self, key: &KeyInfo) -> bool {
        let path = self.project.private_key_path();
        match fs::read_to_string(&path) {
            Ok(armored) => self
                .provider
                .inspect(&armored)
                .map(|info| info.protected)
                .unwrap_or(key.protected),
            Err(_) => key.protected,
        }
    }

    /// Encrypt every file matched by the configured patterns.
    ///
    /// Example files and existing ciphertext are never matched.
    pub fn encrypt_all(&self) -> Result<BatchReport> {
        self.key_id()?;
        let suffix = self.suffix();
        let files: Vec<PathBuf> = self
            .expand(&self.config.patterns())?
            .into_iter()
            .filter(|p| !example::is_example(p) && !has_suffix(p, suffix))
            .collect();

        let mut report = BatchReport::default();
        for path in files {
            let (outcome, warning) = match self.encrypt(&path) {
                Ok(done) => (Ok(done.ciphertext), None),
                // the ciphertext is written, only the example is missing
                Err(Error::Example(e)) => (Ok(with_suffix(&path, suffix)), Some(e.to_string())),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "encrypt failed");
                    (Err(e), None)
                }
            };
            report.results.push(FileResult {
                path,
                outcome,
                warning,
            });
        }
        Ok(report)
    }

    /// Decrypt the ciphertext of every file matched by the configured patterns.
    pub fn decrypt_all(&self, prompt: &dyn SecretPrompt) -> Result<BatchReport> {
        self.key_id()?;
        let patterns: Vec<String> = self
            .config
            .patterns()
            .into_iter()
            .map(|p| format!("{}{}", p, self.suffix()))
            .collect();

        let mut report = BatchReport::default();
        for path in self.expand(&patterns)? {
            let outcome = self.decrypt(&path, prompt);
            if let Err(e) = &outcome {
                debug!(path = %path.display(), error = %e, "decrypt failed");
            }
            report.results.push(FileResult {
                path,
                outcome,
                warning: None,
            });
        }
        Ok(report)
    }

    /// Expand glob patterns against the pattern base, in pattern order.
    fn expand(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let base = self.config.pattern_base(self.project);
        let escaped = glob::Pattern::escape(&base.to_string_lossy());
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for pattern in patterns {
            let full = format!("{}/{}", escaped.trim_end_matches('/'), pattern);
            let matches = glob::glob(&full).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.msg.to_string(),
            })?;

            let mut matched: Vec<PathBuf> = matches.filter_map(|m| m.ok()).collect();
            matched.sort();
            for path in matched {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }

        debug!(patterns = patterns.len(), files = files.len(), "expanded patterns");
        Ok(files)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.to_string_lossy().ends_with(suffix)
}

fn strip_suffix(path: &Path, suffix: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(suffix).filter(|s| !s.is_empty())?;
    Some(path.with_file_name(stem))
}
