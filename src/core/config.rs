//! Project configuration.
//!
//! Reads and writes `.secret/config.yaml`, the record binding the active key
//! identifier, the project name and the secret file patterns.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants;
use crate::core::project::{self, Project};
use crate::error::{ConfigError, Result};

/// Contents of `.secret/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Provider identifier: `gpg` or `age`
    pub backend: String,
    /// Active key identifier (short form)
    #[serde(rename = "gpg_key", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Glob patterns selecting the secret files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_files: Vec<String>,
    /// Base directory for the patterns, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_dir: Option<String>,
}

impl ProjectConfig {
    /// Fresh configuration for `backend` with the default secret file patterns.
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            key_id: None,
            project_name: None,
            secret_files: default_secret_files(),
            secret_dir: None,
        }
    }

    /// Load `.secret/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` if the file doesn't exist,
    /// or `ConfigError::Parse` if the YAML is malformed.
    pub fn load(project: &Project) -> Result<Self> {
        let path = project.config_path();
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotInitialized.into());
        }

        let contents = fs::read_to_string(&path).map_err(ConfigError::Read)?;
        let mut config: Self = serde_yaml::from_str(&contents).map_err(ConfigError::Parse)?;
        if config.backend.trim().is_empty() {
            config.backend = constants::DEFAULT_BACKEND.to_string();
        }
        // `gpg_key: ""` means no key
        config.key_id = config
            .key_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        debug!(
            backend = %config.backend,
            key = config.key_id.as_deref().unwrap_or("-"),
            patterns = config.secret_files.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Load the config if present, `None` if the project was never initialized.
    pub fn load_optional(project: &Project) -> Result<Option<Self>> {
        match Self::load(project) {
            Ok(config) => Ok(Some(config)),
            Err(crate::error::Error::Config(ConfigError::NotInitialized)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `.secret/config.yaml`, creating `.secret/` if needed.
    pub fn save(&self, project: &Project) -> Result<()> {
        debug!("saving config");

        let contents = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        project::create_private_dir(&project.secret_dir()).map_err(ConfigError::Write)?;
        project::write_private(&project.config_path(), contents).map_err(ConfigError::Write)?;

        Ok(())
    }

    /// Active key identifier, ignoring blank values.
    pub fn active_key_id(&self) -> Option<&str> {
        self.key_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Secret file patterns, falling back to the defaults when none are listed.
    pub fn patterns(&self) -> Vec<String> {
        if self.secret_files.is_empty() {
            default_secret_files()
        } else {
            self.secret_files.clone()
        }
    }

    /// Directory the patterns are expanded in.
    pub fn pattern_base(&self, project: &Project) -> PathBuf {
        match self.secret_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => project.resolve(dir),
            _ => project.root().to_path_buf(),
        }
    }

    /// Project name, falling back to the project directory name.
    pub fn project_name_or_dir(&self, project: &Project) -> String {
        self.project_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| project.dir_name())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::new(constants::DEFAULT_BACKEND)
    }
}

/// The default secret file patterns.
pub fn default_secret_files() -> Vec<String> {
    constants::DEFAULT_SECRET_FILES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Append protection entries to `.gitignore`, skipping ones already present.
///
/// Covers the private key, the backup directory and every secret pattern.
/// Returns the entries that were added.
pub fn ensure_gitignore(project: &Project, patterns: &[String]) -> Result<Vec<String>> {
    let path = project.root().join(".gitignore");
    let existing = if path.exists() {
        fs::read_to_string(&path)?
    } else {
        String::new()
    };

    let present: Vec<&str> = existing.lines().map(str::trim).collect();
    let wanted = constants::GITIGNORE_ENTRIES
        .iter()
        .map(|s| s.to_string())
        .chain(patterns.iter().cloned());

    let mut added = Vec::new();
    for entry in wanted {
        if !present.contains(&entry.as_str()) && !added.contains(&entry) {
            added.push(entry);
        }
    }

    if added.is_empty() {
        return Ok(added);
    }

    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    if !contents.contains("# secret") {
        contents.push_str("# secret\n");
    }
    for entry in &added {
        contents.push_str(entry);
        contents.push('\n');
    }
    fs::write(&path, contents)?;

    debug!(added = added.len(), "updated .gitignore");
    Ok(added)
}
