//! Project-local paths.
//!
//! Every file the tool reads or writes is resolved relative to a project
//! root, so operations never depend on the process working directory.

use std::path::{Path, PathBuf};

use crate::core::constants;

/// A project directory.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project rooted at the current working directory.
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `.secret/`
    pub fn secret_dir(&self) -> PathBuf {
        self.root.join(constants::SECRET_DIR)
    }

    /// `.secret/config.yaml`
    pub fn config_path(&self) -> PathBuf {
        self.secret_dir().join(constants::CONFIG_FILE)
    }

    /// `.secret/private.asc`
    pub fn private_key_path(&self) -> PathBuf {
        self.secret_dir().join(constants::PRIVATE_KEY_FILE)
    }

    /// `.secret/public.asc`
    pub fn public_key_path(&self) -> PathBuf {
        self.secret_dir().join(constants::PUBLIC_KEY_FILE)
    }

    /// `.secrets/backup`
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(constants::BACKUP_DIR)
    }

    /// Resolve a possibly relative path against the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Name of the root directory, used when no project name is configured.
    pub fn dir_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "default".to_string())
    }
}

/// Filename-safe form of a project name.
///
/// Lower-cases and replaces spaces with underscores; falls back to `"key"`
/// when there is no usable name.
pub fn slug(project_name: Option<&str>) -> String {
    match project_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_lowercase().replace(' ', "_"),
        _ => constants::DEFAULT_KEY_PREFIX.to_string(),
    }
}

/// Create `dir` (and parents), restricted to the owner on Unix.
pub(crate) fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

/// Write `contents` to `path` with 0600 permissions on Unix.
pub(crate) fn write_private(path: &Path, contents: impl AsRef<[u8]>) -> std::io::Result<()> {
    std::fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
