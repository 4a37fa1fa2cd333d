//! Key pair commands: export, import, delete-key.

use std::path::PathBuf;

use tracing::info;

use crate::cli::output;
use crate::cli::prompt::Terminal;
use crate::core::manager::{
    BackupStatus, DeleteOptions, DeleteOutcome, ImportOptions, KeyManager, PassphrasePolicy,
};
use crate::core::project::Project;
use crate::error::Result;

/// Write the project key pair to `dir` (default `.secrets/backup`).
pub fn export(dir: Option<PathBuf>) -> Result<()> {
    let manager = KeyManager::open(Project::current()?)?;
    let (public, private) = manager.export(dir.as_deref())?;

    output::success("exported key pair");
    output::kv("public", output::path(&public));
    output::kv("private", output::path(&private));
    output::warn("the private key file is unencrypted unless the key has a passphrase");
    Ok(())
}

/// Import a key pair from `dir` (default: the project root).
///
/// `passphrase` is `Some(true)` to always ask, `Some(false)` to never ask,
/// `None` to ask only for protected keys.
pub fn import(dir: Option<PathBuf>, force: bool, passphrase: Option<bool>) -> Result<()> {
    let mut manager = KeyManager::open_or_default(Project::current()?)?;
    let options = ImportOptions {
        force,
        passphrase: match passphrase {
            Some(true) => PassphrasePolicy::Always,
            Some(false) => PassphrasePolicy::Never,
            None => PassphrasePolicy::Auto,
        },
    };

    let key = manager.import(dir.as_deref(), options, &Terminal)?;

    output::success(&format!("imported key {}", output::key(&key.info.key_id)));
    output::kv("identity", &key.info.uid);
    output::kv("fingerprint", &key.info.fingerprint);
    info!(key = %key.info.key_id, "import complete");
    Ok(())
}

/// Delete the project key, after a backup unless `no_backup`.
pub fn delete(force: bool, no_backup: bool) -> Result<()> {
    let mut manager = KeyManager::open_or_default(Project::current()?)?;
    let options = DeleteOptions {
        force,
        skip_backup: no_backup,
    };

    match manager.delete(options, &Terminal)? {
        DeleteOutcome::Cancelled => output::dimmed("cancelled, nothing was deleted"),
        DeleteOutcome::Deleted {
            key_id,
            fingerprint,
            backup,
        } => {
            match backup {
                BackupStatus::Written { public, private } => {
                    output::success(&format!(
                        "backed up to {} and {}",
                        output::path(&public),
                        output::path(&private)
                    ));
                }
                BackupStatus::Failed(reason) => {
                    output::warn(&format!("backup failed: {}", reason));
                }
                BackupStatus::Skipped => {}
            }
            output::success(&format!("deleted key {}", output::key(&key_id)));
            output::kv("fingerprint", fingerprint);
        }
    }
    Ok(())
}
