//! Example file generation.
//!
//! Derives a redacted copy of a secret file that keeps its keys and layout
//! but replaces every value with [`PLACEHOLDER`]. The copy is written next
//! to the source under the example naming rule:
//!
//! ```text
//! config.yaml   -> config.example.yaml
//! .config.yaml  -> .config.example.yaml
//! .env          -> .env.example
//! ```
//!
//! Output depends only on the input bytes, so regenerating is stable.
//!
//! [`PLACEHOLDER`]: crate::core::constants::PLACEHOLDER

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::constants::EXAMPLE_INFIX;
use crate::error::ExampleError;

mod env;
mod json;
mod toml;
mod yaml;

/// Secret file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Env,
    Ini,
    Json,
    Yaml,
    Toml,
    /// Anything else; content is never echoed
    Other,
}

impl Format {
    /// Format for a file name.
    ///
    /// The extension is everything after the last `.`, compared
    /// case-insensitively, so `.env` and `dev.env` are both env files.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

        match ext {
            "env" => Self::Env,
            "ini" => Self::Ini,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            _ => Self::Other,
        }
    }

    /// Redact `content`. `name` is only used by [`Format::Other`].
    pub fn redact(self, content: &str, name: &str) -> String {
        match self {
            Self::Env => env::redact(content, env::Dialect::Env),
            Self::Ini => env::redact(content, env::Dialect::Ini),
            Self::Json => json::redact(content),
            Self::Yaml => yaml::redact(content),
            Self::Toml => toml::redact(content),
            Self::Other => format!("# Example file for {}\n", name),
        }
    }
}

/// Example file name for a secret file name.
pub fn example_name(name: &str) -> String {
    if let Some(hidden) = name.strip_prefix('.') {
        if let Some((first, rest)) = hidden.split_once('.') {
            return format!(".{}.{}.{}", first, EXAMPLE_INFIX, rest);
        }
    }

    // a leading dot never starts an extension
    match name.rfind('.').filter(|idx| *idx > 0) {
        Some(idx) => format!("{}.{}{}", &name[..idx], EXAMPLE_INFIX, &name[idx..]),
        None => format!("{}.{}", name, EXAMPLE_INFIX),
    }
}

/// Example file path for a secret file, in the same directory.
pub fn example_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(example_name(&name))
}

/// Whether `path` is itself the example file of some other name.
pub fn is_example(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let segments: Vec<&str> = name.split('.').collect();

    segments
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, segment)| **segment == EXAMPLE_INFIX)
        .any(|(idx, _)| {
            let mut original = segments.clone();
            original.remove(idx);
            example_name(&original.join(".")) == name
        })
}

/// Split a line from `split_inclusive('\n')` into text and line ending.
fn split_eol(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

/// Write the example file for `path` and return where it went.
///
/// # Errors
///
/// Returns `ExampleError::Read` or `ExampleError::Write` on I/O failure.
pub fn generate(path: &Path) -> Result<PathBuf, ExampleError> {
    let bytes = fs::read(path).map_err(|source| ExampleError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let format = Format::from_path(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let redacted = format.redact(&content, &name);

    let output = example_path(path);
    fs::write(&output, redacted).map_err(|source| ExampleError::Write {
        path: output.clone(),
        source,
    })?;

    debug!(source = %path.display(), output = %output.display(), format = ?format, "example written");
    Ok(output)
}
