//! Check command - diagnose the project key.
//!
//! Read-only. Resolves the project key (from config, else by scanning the
//! key store for the project name), inspects the key files on disk and
//! runs a throwaway encryption through the provider.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::cli::output;
use crate::core::key::KeyInfo;
use crate::core::manager::KeyManager;
use crate::core::project::Project;
use crate::error::{CryptoError, Result};

const PROBE: &[u8] = b"secret check probe";

/// Outcome of one diagnostic.
#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct Report {
    backend: String,
    project: String,
    /// Whether the key came from config rather than detection
    configured: bool,
    key: KeyInfo,
    checks: Vec<Check>,
}

/// Run diagnostics, or list every key with `all`.
pub fn execute(all: bool, json: bool) -> Result<()> {
    let project = Project::current()?;
    let manager = KeyManager::open_or_default(project)?;

    if all {
        return list_all(&manager, json);
    }

    let key = manager.active_key()?;
    let checks = vec![
        key_file_check(manager.project().public_key_path(), false),
        key_file_check(manager.project().private_key_path(), true),
        probe(&manager, &key),
    ];

    let report = Report {
        backend: manager.provider().name().to_string(),
        project: manager.config().project_name_or_dir(manager.project()),
        configured: manager.config().active_key_id().is_some(),
        key,
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?);
    } else {
        print_report(&report);
    }

    match report.checks.iter().find(|c| c.name == "encryption" && !c.ok) {
        Some(failed) => Err(CryptoError::EncryptionFailed(failed.detail.clone()).into()),
        None => Ok(()),
    }
}

fn list_all(manager: &KeyManager, json: bool) -> Result<()> {
    let listing = manager.provider().list_secret_keys()?;
    if json {
        let value = serde_json::json!({
            "backend": manager.provider().name(),
            "listing": listing,
        });
        println!("{}", serde_json::to_string_pretty(&value).map_err(std::io::Error::from)?);
    } else if listing.trim().is_empty() {
        output::dimmed("no secret keys in the key store");
    } else {
        print!("{}", listing);
    }
    Ok(())
}

fn key_file_check(path: impl AsRef<Path>, private: bool) -> Check {
    let path = path.as_ref();
    let name = if private { "private key" } else { "public key" };

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => {
            return Check {
                name,
                ok: false,
                detail: format!("{} missing", path.display()),
            }
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode() & 0o777;
        if private && mode & 0o077 != 0 {
            return Check {
                name,
                ok: false,
                detail: format!("{} is mode {:o}, expected 600", path.display(), mode),
            };
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Check {
        name,
        ok: true,
        detail: path.display().to_string(),
    }
}

fn probe(manager: &KeyManager, key: &KeyInfo) -> Check {
    let outcome = manager.provider().encrypt(&key.fingerprint, PROBE);
    debug!(ok = outcome.is_ok(), "encryption probe");

    match outcome {
        Ok(ciphertext) => Check {
            name: "encryption",
            ok: true,
            detail: format!("{} bytes of ciphertext", ciphertext.len()),
        },
        Err(e) => Check {
            name: "encryption",
            ok: false,
            detail: e.to_string(),
        },
    }
}

fn print_report(report: &Report) {
    output::header(&report.project);
    output::kv("backend", &report.backend);
    output::kv("key id", output::key(&report.key.key_id));
    output::kv("fingerprint", &report.key.fingerprint);
    output::kv("identity", &report.key.uid);
    if let Some(created) = report.key.created {
        output::kv("created", created.format("%Y-%m-%d"));
    }
    output::kv("protected", if report.key.protected { "yes" } else { "no" });
    if !report.configured {
        output::warn("key detected by name; no gpg_key in .secret/config.yaml");
    }

    println!();
    for check in &report.checks {
        if check.ok {
            output::success(&format!("{}: {}", check.name, check.detail));
        } else {
            output::warn(&format!("{}: {}", check.name, check.detail));
        }
    }
}
