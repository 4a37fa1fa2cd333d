//! Key manager.
//!
//! Owns the lifecycle of the project's key pair: generation, import, export,
//! deletion and identity resolution. The provider holds the key store; this
//! module keeps `.secret/` and the config in step with it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zeroize::Zeroizing;

use crate::core::backend::EncryptionBackend;
use crate::core::config::ProjectConfig;
use crate::core::key::{KeyInfo, KeyMaterial, KeyRequest, ProjectKey};
use crate::core::listing;
use crate::core::project::{self, Project};
use crate::core::prompt::{Confirm, SecretPrompt};
use crate::core::provider::{self, Provider};
use crate::error::{Error, KeyError, LookupError, Result, ValidationError};

/// When to ask for a passphrase during import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassphrasePolicy {
    /// Ask only if the private key is protected
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Replace a different active key
    pub force: bool,
    pub passphrase: PassphrasePolicy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Skip the confirmation prompt
    pub force: bool,
    pub skip_backup: bool,
}

/// What happened to the backup taken before deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    Skipped,
    Written { public: PathBuf, private: PathBuf },
    /// Deletion went ahead anyway
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted {
        key_id: String,
        fingerprint: String,
        backup: BackupStatus,
    },
}

/// Manages the project's key pair.
pub struct KeyManager {
    project: Project,
    provider: Box<dyn Provider>,
    config: ProjectConfig,
    persisted: bool,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("project", &self.project)
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl KeyManager {
    /// Manager over an explicit provider and config.
    pub fn new(project: Project, provider: Box<dyn Provider>, config: ProjectConfig) -> Self {
        let persisted = project.config_path().exists();
        Self {
            project,
            provider,
            config,
            persisted,
        }
    }

    /// Open an initialized project.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` if `.secret/config.yaml` is missing.
    pub fn open(project: Project) -> Result<Self> {
        let config = ProjectConfig::load(&project)?;
        let provider = provider::from_config(&config)?;
        Ok(Self::new(project, provider, config))
    }

    /// Open a project, falling back to defaults when it has no config.
    ///
    /// The default config is never written back unless an operation
    /// establishes a key.
    pub fn open_or_default(project: Project) -> Result<Self> {
        let config = ProjectConfig::load_optional(&project)?.unwrap_or_default();
        let provider = provider::from_config(&config)?;
        Ok(Self::new(project, provider, config))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Filename prefix for backups and import search.
    pub fn slug(&self) -> String {
        project::slug(self.config.project_name.as_deref())
    }

    /// Encryption backend bound to this project's key.
    ///
    /// `key_override` replaces the configured key identifier.
    pub fn backend<'a>(&'a self, key_override: Option<&'a str>) -> EncryptionBackend<'a> {
        EncryptionBackend::new(
            &self.project,
            self.provider.as_ref(),
            &self.config,
            key_override,
        )
    }

    fn save_config(&mut self) -> Result<()> {
        self.config.save(&self.project)?;
        self.persisted = true;
        Ok(())
    }

    /// Generate a new key pair and make it the project's active key.
    ///
    /// Key files are written before the config, so a failed write never
    /// leaves the config pointing at a key that isn't on disk.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Generation` if the provider fails, or
    /// `KeyError::Persistence` if the key files can't be written.
    pub fn generate(&mut self, request: &KeyRequest) -> Result<ProjectKey> {
        info!(
            provider = self.provider.name(),
            algorithm = %request.algorithm,
            "generating project key"
        );
        let material = self.provider.generate(request)?;

        self.write_key_files(&material)?;
        self.config.key_id = Some(material.info.key_id.clone());
        self.save_config()?;

        debug!(key = %material.info.key_id, "project key active");
        Ok(material)
    }

    /// Write both armored halves to `.secret/`, removing partial files on failure.
    fn write_key_files(&self, material: &KeyMaterial) -> Result<()> {
        let private_path = self.project.private_key_path();
        let public_path = self.project.public_key_path();

        let result = project::create_private_dir(&self.project.secret_dir())
            .map_err(|source| persistence(&self.project.secret_dir(), source))
            .and_then(|_| {
                project::write_private(&private_path, material.private.as_bytes())
                    .map_err(|source| persistence(&private_path, source))
            })
            .and_then(|_| {
                project::write_private(&public_path, material.public.as_bytes())
                    .map_err(|source| persistence(&public_path, source))
            });

        if let Err(e) = result {
            for path in [&private_path, &public_path] {
                if path.exists() {
                    let _ = fs::remove_file(path);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Import a key pair found under `source` (default: the project root).
    ///
    /// Both halves are validated before anything is installed. Re-importing
    /// the active pair is a no-op beyond rewriting the same files.
    ///
    /// # Errors
    ///
    /// - `KeyError::KeyFilesNotFound` if either half is missing
    /// - `ValidationError::InvalidKeyMaterial` if a half doesn't decode
    /// - `ValidationError::KeyPairMismatch` if the halves belong to different keys
    /// - `KeyError::ActiveKeyExists` if another key is active and `force` is off
    pub fn import(
        &mut self,
        source: Option<&Path>,
        options: ImportOptions,
        prompt: &dyn SecretPrompt,
    ) -> Result<ProjectKey> {
        let dir = source
            .map(|s| self.project.resolve(s))
            .unwrap_or_else(|| self.project.root().to_path_buf());
        let (public_path, private_path) = find_key_files(&dir, &self.slug())?;
        info!(
            public = %public_path.display(),
            private = %private_path.display(),
            "importing key pair"
        );

        let public = read_key(&public_path)?;
        let private = Zeroizing::new(read_key(&private_path)?);

        let public_info = self
            .provider
            .inspect(&public)
            .map_err(|reason| invalid(&public_path, reason))?;
        let private_info = self
            .provider
            .inspect(&private)
            .map_err(|reason| invalid(&private_path, reason))?;

        if !private_info.secret {
            return Err(invalid(&private_path, "no private key material".to_string()).into());
        }
        if public_info.fingerprint != private_info.fingerprint {
            return Err(ValidationError::KeyPairMismatch {
                public: public_path.display().to_string(),
                private: private_path.display().to_string(),
            }
            .into());
        }

        if let Some(active) = self.config.active_key_id() {
            let same = private_info.fingerprint.ends_with(&active.to_uppercase());
            if !same && !options.force {
                return Err(KeyError::ActiveKeyExists(active.to_string()).into());
            }
        }

        let ask = match options.passphrase {
            PassphrasePolicy::Always => true,
            PassphrasePolicy::Auto => private_info.protected,
            PassphrasePolicy::Never => false,
        };
        let passphrase = if ask {
            Some(prompt.read_secret("Passphrase for the imported private key")?)
        } else {
            None
        };

        let material = KeyMaterial {
            info: private_info,
            public,
            private,
        };
        self.provider
            .install(&material, passphrase.as_ref().map(|p| p.as_str()))?;
        self.write_key_files(&material)?;

        self.config.key_id = Some(material.info.key_id.clone());
        self.save_config()?;

        debug!(key = %material.info.key_id, "imported key active");
        Ok(material)
    }

    /// Write the active key's armored halves to `output` (default: `.secrets/backup`).
    ///
    /// Files are named `<slug>.pub.asc` and `<slug>.priv.asc`.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::NoActiveKey` if no key is configured.
    pub fn export(&self, output: Option<&Path>) -> Result<(PathBuf, PathBuf)> {
        if self.config.active_key_id().is_none() {
            return Err(KeyError::NoActiveKey.into());
        }
        self.write_backup(output)
    }

    /// Copy the stored key files to `output` under slug-derived names.
    fn write_backup(&self, output: Option<&Path>) -> Result<(PathBuf, PathBuf)> {
        let dir = output
            .map(|o| self.project.resolve(o))
            .unwrap_or_else(|| self.project.backup_dir());
        let slug = self.slug();
        let public_path = dir.join(format!("{}.pub.asc", slug));
        let private_path = dir.join(format!("{}.priv.asc", slug));

        let public = read_stored(&self.project.public_key_path())?;
        let private = Zeroizing::new(read_stored(&self.project.private_key_path())?);

        project::create_private_dir(&dir).map_err(|source| persistence(&dir, source))?;
        project::write_private(&public_path, &public)
            .map_err(|source| persistence(&public_path, source))?;
        project::write_private(&private_path, private.as_bytes())
            .map_err(|source| persistence(&private_path, source))?;

        debug!(dir = %dir.display(), "exported key pair");
        Ok((public_path, private_path))
    }

    /// Delete the active key from the provider and the project.
    ///
    /// Deletion always targets the full fingerprint. A failed backup is
    /// reported in the outcome but doesn't stop deletion; a failed delete is
    /// fatal and carries the manual command to finish the job.
    ///
    /// # Errors
    ///
    /// - `KeyError::KeyNotFound` if the key is gone from the store (the
    ///   dangling config reference is cleared first)
    /// - `KeyError::DeleteFailed` if the provider can't delete it
    pub fn delete(
        &mut self,
        options: DeleteOptions,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        let key_id = match self.config.active_key_id() {
            Some(id) => id.to_string(),
            None => {
                let name = self.config.project_name_or_dir(&self.project);
                debug!(project = %name, "no key in config, scanning key listing");
                self.detect_project_key(&name)?
            }
        };

        let key = match self.provider.lookup(&key_id) {
            Ok(key) => key,
            Err(Error::Lookup(LookupError::FingerprintNotFound(_))) => {
                warn!(key = %key_id, "configured key missing from store, clearing config");
                if self.config.key_id.take().is_some() && self.persisted {
                    self.save_config()?;
                }
                return Err(KeyError::KeyNotFound(key_id).into());
            }
            Err(e) => return Err(e),
        };

        if !options.force {
            let question = format!(
                "Delete key {} ({} <{}>)? This cannot be undone",
                key.key_id,
                key.name(),
                key.email().unwrap_or("-")
            );
            if !confirm.confirm(&question)? {
                debug!("deletion cancelled");
                return Ok(DeleteOutcome::Cancelled);
            }
        }

        let backup = if options.skip_backup {
            BackupStatus::Skipped
        } else {
            match self.backup_key(&key) {
                Ok((public, private)) => BackupStatus::Written { public, private },
                Err(e) => {
                    warn!(error = %e, "backup before deletion failed, continuing");
                    BackupStatus::Failed(e.to_string())
                }
            }
        };

        self.provider.delete(&key.fingerprint)?;
        info!(fingerprint = %key.fingerprint, "key deleted from store");

        for path in [
            self.project.private_key_path(),
            self.project.public_key_path(),
        ] {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "could not remove key file");
                }
            }
        }

        self.config.key_id = None;
        if self.persisted {
            self.save_config()?;
        }

        Ok(DeleteOutcome::Deleted {
            key_id: key.key_id,
            fingerprint: key.fingerprint,
            backup,
        })
    }

    /// Back up the stored key files, provided they hold `key`.
    ///
    /// Works for a key found by detection as well as a configured one.
    fn backup_key(&self, key: &KeyInfo) -> Result<(PathBuf, PathBuf)> {
        let public_path = self.project.public_key_path();
        let stored = self
            .provider
            .inspect(&read_stored(&public_path)?)
            .map_err(|reason| invalid(&public_path, reason))?;
        if stored.fingerprint != key.fingerprint {
            return Err(KeyError::Store(format!(
                "{} holds key {}, not {}",
                public_path.display(),
                stored.key_id,
                key.key_id
            ))
            .into());
        }
        self.write_backup(None)
    }

    /// Full fingerprint for a short key identifier.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::FingerprintNotFound` if the store has no match.
    pub fn resolve_fingerprint(&self, key_id: &str) -> Result<String> {
        Ok(self.provider.lookup(key_id)?.fingerprint)
    }

    /// Identifier of the stored key whose identity mentions `project_name`.
    pub fn detect_project_key(&self, project_name: &str) -> Result<String> {
        let listing = self.provider.list_secret_keys()?;
        listing::detect_project_key(&listing, project_name)
    }

    /// The active key, from config or detected by project name.
    pub fn active_key(&self) -> Result<KeyInfo> {
        let key_id = match self.config.active_key_id() {
            Some(id) => id.to_string(),
            None => self.detect_project_key(&self.config.project_name_or_dir(&self.project))?,
        };
        self.provider.lookup(&key_id)
    }
}

/// Locate a `<prefix>` public/private pair under `dir`.
///
/// Matching is on lower-cased file names; the first match of each kind in
/// sorted walk order wins.
pub fn find_key_files(dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
    let prefix = prefix.to_lowercase();
    let mut public = None;
    let mut private = None;

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.contains(&prefix) {
            continue;
        }

        if public.is_none()
            && (name.ends_with(".pub.asc") || name.ends_with("_pub.asc") || name.contains("public"))
        {
            public = Some(entry.path().to_path_buf());
        }
        if private.is_none()
            && (name.ends_with(".priv.asc")
                || name.ends_with("_priv.asc")
                || name.ends_with(".private.asc")
                || name.contains("private"))
        {
            private = Some(entry.path().to_path_buf());
        }
        if public.is_some() && private.is_some() {
            break;
        }
    }

    match (public, private) {
        (Some(public), Some(private)) => Ok((public, private)),
        _ => Err(KeyError::KeyFilesNotFound {
            dir: dir.to_path_buf(),
            prefix,
        }
        .into()),
    }
}

fn read_key(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()).into())
}

fn read_stored(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| persistence(path, source).into())
}

fn invalid(path: &Path, reason: String) -> ValidationError {
    ValidationError::InvalidKeyMaterial {
        path: path.to_path_buf(),
        reason,
    }
}

fn persistence(path: &Path, source: std::io::Error) -> KeyError {
    KeyError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}
