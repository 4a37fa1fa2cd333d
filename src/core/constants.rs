//! Constants used throughout secret.
//!
//! Centralizes fixed paths, file names and defaults.

/// Project-local directory holding the key pair and config (`.secret/`).
pub const SECRET_DIR: &str = ".secret";

/// Configuration file name inside [`SECRET_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

/// Armored private key file name inside [`SECRET_DIR`].
pub const PRIVATE_KEY_FILE: &str = "private.asc";

/// Armored public key file name inside [`SECRET_DIR`].
pub const PUBLIC_KEY_FILE: &str = "public.asc";

/// Backup directory relative to the project root.
pub const BACKUP_DIR: &str = ".secrets/backup";

/// Filename prefix for exported keys when no project name is set.
pub const DEFAULT_KEY_PREFIX: &str = "key";

/// Secret file patterns used when the config lists none.
pub const DEFAULT_SECRET_FILES: &[&str] = &[".env", "dev.env", "config.json", ".config.yaml"];

/// Default backend identifier.
pub const DEFAULT_BACKEND: &str = "gpg";

/// Domain used for synthesized project key identities.
pub const IDENTITY_DOMAIN: &str = "team.org";

/// Literal written in place of every redacted value.
pub const PLACEHOLDER: &str = "<placeholder>";

/// Infix inserted into example file names.
pub const EXAMPLE_INFIX: &str = "example";

/// Age key store relative to HOME.
pub const AGE_KEYRING_DIR: &str = ".local/share/secret/age";

/// Lines walked back from a matching `uid` line to find its `sec` header.
pub const DETECT_LOOKBACK: usize = 5;

/// Gitignore entries written by `init`, before the secret file patterns.
pub const GITIGNORE_ENTRIES: &[&str] = &[".secret/private.asc", ".secrets/"];
