//! Key listing parsing.
//!
//! Providers render their secret keys in the familiar `gpg --list-secret-keys
//! --keyid-format=LONG` shape:
//!
//! ```text
//! sec   rsa4096/3AA5C34371567BD2 2026-10-18 [SC]
//!       4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343
//! uid                 [ultimate] Demo Project Key <project+demo@team.org>
//! ```
//!
//! This module recovers key identifiers from such text.

use tracing::debug;

use crate::core::constants::DETECT_LOOKBACK;
use crate::error::{LookupError, Result};

/// Find the key whose identity mentions `project_name`.
///
/// For every `uid` line containing the name (case-insensitive), walks back at
/// most five lines to the nearest `sec` header and takes the identifier after
/// the `/` in its second column. Best effort: fails with
/// `LookupError::ProjectKeyNotDetected` when nothing matches or when several
/// distinct keys do.
pub fn detect_project_key(listing: &str, project_name: &str) -> Result<String> {
    let needle = project_name.trim().to_lowercase();
    if needle.is_empty() {
        return Err(LookupError::ProjectKeyNotDetected(project_name.to_string()).into());
    }

    let lines: Vec<&str> = listing.lines().collect();
    let mut found: Vec<String> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with("uid") || !trimmed.to_lowercase().contains(&needle) {
            continue;
        }

        let header = (1..=DETECT_LOOKBACK)
            .take_while(|back| *back <= idx)
            .map(|back| lines[idx - back])
            .find(|prev| prev.trim_start().starts_with("sec"));

        if let Some(id) = header.and_then(key_id_from_header) {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }

    debug!(project = %project_name, candidates = found.len(), "scanned key listing");

    match found.len() {
        1 => Ok(found.remove(0)),
        _ => Err(LookupError::ProjectKeyNotDetected(project_name.to_string()).into()),
    }
}

/// Identifier from a `sec   rsa4096/ID date ...` header line.
fn key_id_from_header(line: &str) -> Option<String> {
    let column = line.split_whitespace().nth(1)?;
    let (_, id) = column.split_once('/')?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
