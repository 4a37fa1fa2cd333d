//! Secret - project-bound key management and secret file encryption.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init          # Generate the project key and config
//! │   ├── check         # Key diagnostics
//! │   ├── encrypt       # Encrypt secret files
//! │   ├── decrypt       # Decrypt secret files
//! │   ├── keys          # export / import / delete-key
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # .secret/config.yaml
//!     ├── manager       # Key lifecycle
//!     ├── backend       # File encryption, batch mode
//!     ├── example/      # Redacted example files
//!     │   ├── mod       # Naming rule, format dispatch
//!     │   └── env, json, yaml, toml
//!     └── provider/     # Cryptographic providers
//!         ├── mod       # Provider trait
//!         ├── gpg       # gpg CLI
//!         └── age       # embedded age
//! ```
//!
//! # Features
//!
//! - One active key pair per project, kept under `.secret/`
//! - Pluggable providers: the gpg CLI or embedded age
//! - Ciphertext siblings (`.env.gpg`) plus committed-safe examples (`.env.example`)
//! - Backup before delete, always by full fingerprint

pub mod cli;
pub mod core;
pub mod error;
