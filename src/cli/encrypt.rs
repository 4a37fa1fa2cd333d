//! Encrypt command.

use std::path::PathBuf;

use crate::cli::output;
use crate::core::backend::BatchReport;
use crate::core::manager::KeyManager;
use crate::core::project::Project;
use crate::error::{Error, Result};

/// Encrypt one file, or every configured secret file with `all`.
pub fn execute(path: Option<PathBuf>, key: Option<String>, all: bool) -> Result<()> {
    let manager = KeyManager::open(Project::current()?)?;
    let backend = manager.backend(key.as_deref());

    let path = match path {
        Some(path) if !all => path,
        _ => {
            let report = backend.encrypt_all()?;
            print_batch(&report, "encrypted");
            return Ok(());
        }
    };

    match backend.encrypt(&path) {
        Ok(done) => {
            output::success(&format!(
                "encrypted {} -> {}",
                output::path(&path),
                output::path(&done.ciphertext)
            ));
            output::dimmed(&format!("example: {}", done.example.display()));
            Ok(())
        }
        // the ciphertext is already written
        Err(Error::Example(e)) => {
            output::success(&format!("encrypted {}", output::path(&path)));
            output::warn(&e.to_string());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Per-file lines and a `processed N of M` summary.
pub(crate) fn print_batch(report: &BatchReport, verb: &str) {
    if report.total() == 0 {
        output::dimmed("no files matched secret_files");
        return;
    }

    for result in &report.results {
        match &result.outcome {
            Ok(written) => {
                output::success(&format!(
                    "{} {} -> {}",
                    verb,
                    output::path(&result.path),
                    output::path(written)
                ));
                if let Some(warning) = &result.warning {
                    output::warn(warning);
                }
            }
            Err(e) => output::warn(&format!("{}: {}", result.path.display(), e)),
        }
    }

    println!(
        "processed {} of {} files",
        report.succeeded(),
        report.total()
    );
}
