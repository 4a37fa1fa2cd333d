//! Decrypt command.

use std::path::PathBuf;

use crate::cli::encrypt::print_batch;
use crate::cli::output;
use crate::cli::prompt::Terminal;
use crate::core::manager::KeyManager;
use crate::core::project::Project;
use crate::error::Result;

/// Decrypt one file, or the ciphertext of every configured secret file with `all`.
pub fn execute(path: Option<PathBuf>, all: bool) -> Result<()> {
    let manager = KeyManager::open(Project::current()?)?;
    let backend = manager.backend(None);

    match path {
        Some(path) if !all => {
            let written = backend.decrypt(&path, &Terminal)?;
            output::success(&format!(
                "decrypted {} -> {}",
                output::path(&path),
                output::path(&written)
            ));
        }
        _ => {
            let report = backend.decrypt_all(&Terminal)?;
            print_batch(&report, "decrypted");
        }
    }
    Ok(())
}
