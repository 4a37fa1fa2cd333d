//! Command-line interface.

pub mod check;
pub mod completions;
pub mod decrypt;
pub mod encrypt;
pub mod init;
pub mod keys;
pub mod output;
pub mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Secret - project-bound key management and secret file encryption.
#[derive(Parser)]
#[command(
    name = "secret",
    about = "Encrypt project secret files with a per-project key pair",
    version
)]
pub struct Cli {
    /// Show debug logging (overridden by SECRET_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Generate the project key and write .secret/config.yaml
    Init {
        /// Cryptographic backend
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,
        /// Secret file patterns, comma separated
        #[arg(long, value_delimiter = ',')]
        files: Option<Vec<String>>,
        /// Key algorithm family
        #[arg(long, value_enum)]
        algorithm: Option<AlgorithmArg>,
        /// RSA key size in bits
        #[arg(long, value_parser = clap::value_parser!(u32))]
        key_size: Option<u32>,
        /// Protect the private key with a passphrase
        #[arg(long, conflicts_with = "no_passphrase")]
        passphrase: bool,
        /// Leave the private key unprotected
        #[arg(long)]
        no_passphrase: bool,
        /// Replace an existing active key
        #[arg(short, long)]
        force: bool,
    },

    /// Diagnose the project key
    Check {
        /// List every secret key in the key store
        #[arg(short, long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt a secret file, or every configured one
    Encrypt {
        /// File to encrypt
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        path: Option<PathBuf>,
        /// Key identifier to use instead of the configured one
        #[arg(short, long)]
        key: Option<String>,
        /// Encrypt every file matched by secret_files
        #[arg(short, long)]
        all: bool,
    },

    /// Decrypt a ciphertext file, or every configured one
    Decrypt {
        /// File to decrypt (e.g. .env.gpg)
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        path: Option<PathBuf>,
        /// Decrypt the ciphertext of every file matched by secret_files
        #[arg(short, long)]
        all: bool,
    },

    /// Export the project key pair
    Export {
        /// Output directory (default: .secrets/backup)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a project key pair from a directory
    Import {
        /// Directory to search (default: project root)
        #[arg(conflicts_with = "dir")]
        directory: Option<PathBuf>,
        /// Directory to search
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Replace a different active key
        #[arg(short, long)]
        force: bool,
        /// Always ask for the private key passphrase
        #[arg(long, conflicts_with = "no_passphrase")]
        passphrase: bool,
        /// Never ask for a passphrase
        #[arg(long)]
        no_passphrase: bool,
    },

    /// Delete the project key from the key store
    DeleteKey {
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
        /// Don't write a backup first
        #[arg(long)]
        no_backup: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Cryptographic backends.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Gpg,
    Age,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpg => "gpg",
            Self::Age => "age",
        }
    }
}

/// Key algorithm families.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmArg {
    Rsa,
    Ecc,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a command.
pub fn execute(command: Command) -> crate::error::Result<()> {
    use Command::*;

    match command {
        Init {
            backend,
            name,
            files,
            algorithm,
            key_size,
            passphrase,
            no_passphrase,
            force,
        } => init::execute(init::InitArgs {
            backend,
            name,
            files,
            algorithm,
            key_size,
            passphrase: flag_choice(passphrase, no_passphrase),
            force,
        }),
        Check { all, json } => check::execute(all, json),
        Encrypt { path, key, all } => encrypt::execute(path, key, all),
        Decrypt { path, all } => decrypt::execute(path, all),
        Export { output } => keys::export(output),
        Import {
            directory,
            dir,
            force,
            passphrase,
            no_passphrase,
        } => keys::import(
            directory.or(dir),
            force,
            flag_choice(passphrase, no_passphrase),
        ),
        DeleteKey { force, no_backup } => keys::delete(force, no_backup),
        Completions { shell } => completions::execute(shell),
    }
}

/// `Some(true)` for `--x`, `Some(false)` for `--no-x`, `None` for neither.
fn flag_choice(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
