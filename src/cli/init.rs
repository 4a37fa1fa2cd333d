//! Init command - generate the project key.
//!
//! Asks for anything not given as a flag when stdin is a terminal; otherwise
//! falls back to defaults so scripts can run it unattended.

use dialoguer::{Confirm, Input, Select};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::prompt::Terminal;
use crate::cli::{AlgorithmArg, Backend};
use crate::core::config::{self, ProjectConfig};
use crate::core::constants;
use crate::core::key::{Algorithm, KeyRequest, KeySize};
use crate::core::manager::KeyManager;
use crate::core::project::Project;
use crate::core::provider;
use crate::error::{ConfigError, Result};

/// Flags accepted by `secret init`.
#[derive(Debug, Default)]
pub struct InitArgs {
    pub backend: Option<Backend>,
    pub name: Option<String>,
    pub files: Option<Vec<String>>,
    pub algorithm: Option<AlgorithmArg>,
    pub key_size: Option<u32>,
    /// `Some(true)` asks for a passphrase, `Some(false)` skips it
    pub passphrase: Option<bool>,
    pub force: bool,
}

/// Initialize secret in the current directory.
pub fn execute(args: InitArgs) -> Result<()> {
    let project = Project::current()?;
    let existing = ProjectConfig::load_optional(&project)?;

    if let Some(active) = existing.as_ref().and_then(|c| c.active_key_id().map(String::from)) {
        if !args.force {
            return Err(ConfigError::AlreadyInitialized(active).into());
        }
        output::warn(&format!(
            "replacing active key {}; it stays in the key store",
            output::key(&active)
        ));
    }

    let interactive = Terminal::is_interactive();
    let backend = args
        .backend
        .map(|b| b.as_str().to_string())
        .or_else(|| existing.as_ref().map(|c| c.backend.clone()))
        .unwrap_or_else(|| constants::DEFAULT_BACKEND.to_string());
    let provider = provider::from_backend(&backend)?;

    let name = match args.name {
        Some(name) => name,
        None if interactive => Input::new()
            .with_prompt("Project name")
            .default(project.dir_name())
            .interact_text()?,
        None => project.dir_name(),
    };

    let files = match args.files {
        Some(files) => files,
        None if interactive => {
            let answer: String = Input::new()
                .with_prompt("Secret files (comma separated)")
                .default(config::default_secret_files().join(","))
                .interact_text()?;
            split_patterns(&answer)
        }
        None => config::default_secret_files(),
    };

    let algorithm = choose_algorithm(args.algorithm, args.key_size, &backend, interactive)?;
    let passphrase = choose_passphrase(args.passphrase, interactive)?;

    let mut project_config = ProjectConfig::new(backend);
    project_config.project_name = Some(name.clone());
    project_config.secret_files = files;
    project_config.secret_dir = existing.and_then(|c| c.secret_dir);
    debug!(config = ?project_config, "initializing project");

    let request = KeyRequest::for_project(&name, algorithm).with_passphrase(passphrase);
    let mut manager = KeyManager::new(project, provider, project_config);
    let key = manager.generate(&request)?;

    let patterns = manager.config().patterns();
    let added = config::ensure_gitignore(manager.project(), &patterns)?;

    output::success(&format!(
        "generated {} key {}",
        algorithm,
        output::key(&key.info.key_id)
    ));
    output::kv("identity", &key.info.uid);
    output::kv("fingerprint", &key.info.fingerprint);
    output::kv("config", output::path(manager.project().config_path()));
    if !added.is_empty() {
        output::kv(".gitignore", format!("+{} entries", added.len()));
    }
    output::hint("run: secret encrypt --all");

    info!(key = %key.info.key_id, "initialized");
    Ok(())
}

fn choose_algorithm(
    algorithm: Option<AlgorithmArg>,
    key_size: Option<u32>,
    backend: &str,
    interactive: bool,
) -> Result<Algorithm> {
    let family = match algorithm {
        Some(family) => family,
        // age only has one algorithm
        None if backend == "age" => AlgorithmArg::Ecc,
        None if interactive && key_size.is_none() => {
            let choice = Select::new()
                .with_prompt("Key algorithm")
                .items(&["RSA", "ECC (Curve25519)"][..])
                .default(0)
                .interact()?;
            if choice == 0 {
                AlgorithmArg::Rsa
            } else {
                AlgorithmArg::Ecc
            }
        }
        None => AlgorithmArg::Rsa,
    };

    if family == AlgorithmArg::Ecc {
        return Ok(Algorithm::Ecc);
    }

    let size = match key_size {
        Some(bits) => KeySize::try_from(bits)?,
        None if interactive => {
            let sizes = [KeySize::Rsa4096, KeySize::Rsa3072, KeySize::Rsa2048];
            let labels: Vec<String> = sizes.iter().map(|s| s.bits().to_string()).collect();
            let choice = Select::new()
                .with_prompt("Key size")
                .items(&labels[..])
                .default(0)
                .interact()?;
            sizes[choice]
        }
        None => KeySize::default(),
    };
    Ok(Algorithm::Rsa(size))
}

fn choose_passphrase(flag: Option<bool>, interactive: bool) -> Result<Option<Zeroizing<String>>> {
    let wanted = match flag {
        Some(wanted) => wanted,
        None if interactive => Confirm::new()
            .with_prompt("Protect the private key with a passphrase?")
            .default(false)
            .interact()?,
        None => false,
    };

    if wanted {
        Terminal.new_passphrase()
    } else {
        Ok(None)
    }
}

fn split_patterns(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
