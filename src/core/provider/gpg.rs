//! GPG provider.
//!
//! Drives the installed `gpg` binary. Keys live in the user's keyring, or in
//! an explicit home directory when one is given (`--homedir`).
//!
//! ## Requirements
//!
//! - `gpg` 2.1 or newer on `PATH`
//! - loopback pinentry allowed (the default) for passphrase-protected keys

use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::Provider;
use crate::core::key::{Algorithm, KeyInfo, KeyMaterial, KeyRequest};
use crate::error::{CryptoError, KeyError, LookupError, Result};

/// GPG provider using the gpg CLI
#[derive(Debug, Clone, Default)]
pub struct Gpg {
    home: Option<PathBuf>,
}

impl Gpg {
    /// Provider over the default keyring (`GNUPGHOME` or `~/.gnupg`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider over the keyring in `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }

    /// Check if gpg CLI is available
    fn check_gpg() -> Result<()> {
        which::which("gpg").map_err(|_| {
            LookupError::ProviderUnavailable(
                "gpg CLI not found. Install GnuPG from https://gnupg.org/download/".to_string(),
            )
        })?;
        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("gpg");
        if let Some(home) = &self.home {
            cmd.arg("--homedir").arg(home);
        }
        cmd.args(["--batch", "--no-tty"]);
        cmd
    }

    /// Run gpg with `args`, feeding `input` on stdin.
    ///
    /// stdin is written from a scoped thread so large payloads can't deadlock
    /// against a full stdout pipe.
    fn run<I, S>(&self, args: I, input: Option<&[u8]>) -> std::io::Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        trace!(command = ?cmd, "running gpg");

        let mut child = cmd.spawn()?;
        match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => std::thread::scope(|scope| {
                scope.spawn(move || {
                    // gpg may exit before reading everything; its status decides
                    let _ = stdin.write_all(bytes);
                });
                child.wait_with_output()
            }),
            _ => child.wait_with_output(),
        }
    }

    /// Run gpg and map a non-zero exit to its stderr.
    fn run_ok<I, S>(&self, args: I, input: Option<&[u8]>) -> std::result::Result<Output, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .run(args, input)
            .map_err(|e| format!("failed to run gpg: {}", e))?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(stderr_text(&output))
        }
    }

    /// Whether armored secret key material carries S2K protection.
    fn is_protected(&self, armored: &str) -> bool {
        self.run(["--list-packets"], Some(armored.as_bytes()))
            .map(|out| {
                let text = String::from_utf8_lossy(&out.stdout);
                text.contains("protected]") || text.contains("S2K")
            })
            .unwrap_or(false)
    }

    fn export_public(&self, fingerprint: &str) -> std::result::Result<String, String> {
        let out = self.run_ok(["--armor", "--export", fingerprint], None)?;
        String::from_utf8(out.stdout).map_err(|e| format!("UTF-8 error: {}", e))
    }

    fn export_private(
        &self,
        fingerprint: &str,
        passphrase: Option<&str>,
    ) -> std::result::Result<Zeroizing<String>, String> {
        let out = match passphrase {
            Some(pass) => {
                let input = Zeroizing::new(format!("{}\n", pass));
                self.run_ok(
                    [
                        "--pinentry-mode",
                        "loopback",
                        "--passphrase-fd",
                        "0",
                        "--armor",
                        "--export-secret-keys",
                        fingerprint,
                    ],
                    Some(input.as_bytes()),
                )?
            }
            None => self.run_ok(["--armor", "--export-secret-keys", fingerprint], None)?,
        };
        String::from_utf8(out.stdout)
            .map(Zeroizing::new)
            .map_err(|e| format!("UTF-8 error: {}", e))
    }
}

impl Provider for Gpg {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn suffix(&self) -> &'static str {
        ".gpg"
    }

    fn generate(&self, request: &KeyRequest) -> Result<KeyMaterial> {
        Self::check_gpg()?;
        debug!(uid = %request.uid(), algorithm = %request.algorithm, "generating gpg key");

        let params = key_params(request);
        let out = self
            .run_ok(
                ["--status-fd", "1", "--pinentry-mode", "loopback", "--gen-key"],
                Some(params.as_bytes()),
            )
            .map_err(KeyError::Generation)?;

        let fingerprint = created_fingerprint(&String::from_utf8_lossy(&out.stdout))
            .ok_or_else(|| KeyError::Generation("gpg did not report the new key".to_string()))?;

        let mut info = self.lookup(&fingerprint)?;
        info.secret = true;
        info.protected = request.passphrase().is_some();

        let public = self
            .export_public(&fingerprint)
            .map_err(KeyError::Generation)?;
        let private = self
            .export_private(&fingerprint, request.passphrase())
            .map_err(KeyError::Generation)?;

        debug!(key = %info.key_id, "gpg key generated");
        Ok(KeyMaterial {
            info,
            public,
            private,
        })
    }

    fn inspect(&self, armored: &str) -> std::result::Result<KeyInfo, String> {
        if !armored.contains("-----BEGIN PGP") {
            return Err("not an armored OpenPGP key".to_string());
        }
        Self::check_gpg().map_err(|e| e.to_string())?;

        let out = self.run_ok(
            ["--with-colons", "--import-options", "show-only", "--import"],
            Some(armored.as_bytes()),
        )?;
        let mut info = parse_colons(&String::from_utf8_lossy(&out.stdout))
            .into_iter()
            .next()
            .ok_or_else(|| "no key found in armored block".to_string())?;

        if info.secret {
            info.protected = self.is_protected(armored);
        }
        Ok(info)
    }

    fn install(&self, material: &KeyMaterial, passphrase: Option<&str>) -> Result<()> {
        Self::check_gpg()?;
        debug!(key = %material.info.key_id, "importing key into gpg keyring");

        self.run_ok(["--import"], Some(material.public.as_bytes()))
            .map_err(KeyError::Store)?;

        match passphrase {
            Some(pass) => {
                // stdin carries the passphrase, so the key goes through a file
                let mut file = tempfile::NamedTempFile::new()?;
                file.write_all(material.private.as_bytes())?;
                file.flush()?;

                let input = Zeroizing::new(format!("{}\n", pass));
                let mut args: Vec<&OsStr> = [
                    "--pinentry-mode",
                    "loopback",
                    "--passphrase-fd",
                    "0",
                    "--import",
                ]
                .iter()
                .map(OsStr::new)
                .collect();
                args.push(file.path().as_os_str());
                self.run_ok(args, Some(input.as_bytes()))
                    .map_err(KeyError::Store)?;
            }
            None => {
                self.run_ok(["--import"], Some(material.private.as_bytes()))
                    .map_err(KeyError::Store)?;
            }
        }

        Ok(())
    }

    fn list_secret_keys(&self) -> Result<String> {
        Self::check_gpg()?;
        let out = self
            .run_ok(["--list-secret-keys", "--keyid-format=LONG"], None)
            .map_err(KeyError::Store)?;
        Ok(String::from_utf8_lossy(&out.stdout).to_string())
    }

    fn lookup(&self, key_id: &str) -> Result<KeyInfo> {
        Self::check_gpg()?;

        let out = self
            .run_ok(["--with-colons", "--list-keys", key_id], None)
            .map_err(|_| LookupError::FingerprintNotFound(key_id.to_string()))?;

        let mut keys = parse_colons(&String::from_utf8_lossy(&out.stdout));
        let mut info = match keys.len() {
            0 => return Err(LookupError::FingerprintNotFound(key_id.to_string()).into()),
            1 => keys.remove(0),
            count => {
                return Err(LookupError::Ambiguous {
                    key_id: key_id.to_string(),
                    count,
                }
                .into())
            }
        };

        info.secret = self
            .run(["--with-colons", "--list-secret-keys", &info.fingerprint], None)
            .map(|out| out.status.success())
            .unwrap_or(false);

        trace!(key = %key_id, fingerprint = %info.fingerprint, "resolved key");
        Ok(info)
    }

    fn delete(&self, fingerprint: &str) -> Result<()> {
        Self::check_gpg()?;
        debug!(fingerprint = %fingerprint, "deleting gpg key");

        self.run_ok(
            ["--yes", "--delete-secret-and-public-key", fingerprint],
            None,
        )
        .map_err(|reason| KeyError::DeleteFailed {
            fingerprint: fingerprint.to_string(),
            reason,
            remediation: self.delete_hint(fingerprint),
        })?;
        Ok(())
    }

    fn delete_hint(&self, fingerprint: &str) -> String {
        match &self.home {
            Some(home) => format!(
                "gpg --homedir {} --delete-secret-and-public-key {}",
                home.display(),
                fingerprint
            ),
            None => format!("gpg --delete-secret-and-public-key {}", fingerprint),
        }
    }

    fn encrypt(&self, fingerprint: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        Self::check_gpg()?;
        trace!(plaintext_len = plaintext.len(), "encrypting with gpg");

        let out = self
            .run_ok(
                [
                    "--yes",
                    "--trust-model",
                    "always",
                    "--encrypt",
                    "--recipient",
                    fingerprint,
                    "--output",
                    "-",
                ],
                Some(plaintext),
            )
            .map_err(|e| CryptoError::EncryptionFailed(format!("gpg encrypt failed: {}", e)))?;

        trace!(ciphertext_len = out.stdout.len(), "encrypted with gpg");
        Ok(out.stdout)
    }

    fn decrypt(
        &self,
        fingerprint: &str,
        ciphertext: &[u8],
        passphrase: Option<&str>,
    ) -> Result<Vec<u8>> {
        Self::check_gpg()?;
        trace!(ciphertext_len = ciphertext.len(), "decrypting with gpg");

        let has_secret = self
            .run(["--with-colons", "--list-secret-keys", fingerprint], None)
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !has_secret {
            return Err(CryptoError::DecryptionFailed(format!(
                "private key {} is not in the gpg keyring",
                fingerprint
            ))
            .into());
        }

        // stdin is reserved for the passphrase
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(ciphertext)?;
        file.flush()?;

        let mut args: Vec<&OsStr> = ["--yes", "--pinentry-mode", "loopback", "--output", "-"]
            .iter()
            .map(OsStr::new)
            .collect();
        let input = passphrase.map(|pass| Zeroizing::new(format!("{}\n", pass)));
        if input.is_some() {
            args.push(OsStr::new("--passphrase-fd"));
            args.push(OsStr::new("0"));
        }
        args.push(OsStr::new("--decrypt"));
        args.push(file.path().as_os_str());

        let out = self
            .run_ok(args, input.as_ref().map(|i| i.as_bytes()))
            .map_err(|e| CryptoError::DecryptionFailed(format!("gpg decrypt failed: {}", e)))?;

        trace!(plaintext_len = out.stdout.len(), "decrypted with gpg");
        Ok(out.stdout)
    }
}

/// Batch parameter block for `gpg --gen-key`.
fn key_params(request: &KeyRequest) -> Zeroizing<String> {
    let mut params = String::new();
    match request.algorithm {
        Algorithm::Rsa(size) => {
            params.push_str(&format!("Key-Type: RSA\nKey-Length: {}\n", size.bits()));
            params.push_str(&format!(
                "Subkey-Type: RSA\nSubkey-Length: {}\nSubkey-Usage: encrypt\n",
                size.bits()
            ));
        }
        Algorithm::Ecc => {
            params.push_str("Key-Type: EDDSA\nKey-Curve: ed25519\n");
            params.push_str("Subkey-Type: ECDH\nSubkey-Curve: cv25519\nSubkey-Usage: encrypt\n");
        }
    }
    params.push_str(&format!("Name-Real: {}\n", request.name));
    params.push_str(&format!("Name-Email: {}\n", request.email));
    params.push_str("Expire-Date: 0\n");
    match request.passphrase() {
        Some(pass) => params.push_str(&format!("Passphrase: {}\n", pass)),
        None => params.push_str("%no-protection\n"),
    }
    params.push_str("%commit\n");
    Zeroizing::new(params)
}

/// Fingerprint from a `[GNUPG:] KEY_CREATED <type> <fingerprint>` status line.
fn created_fingerprint(status: &str) -> Option<String> {
    status
        .lines()
        .filter(|line| line.contains("KEY_CREATED"))
        .find_map(|line| line.split_whitespace().nth(3).map(str::to_string))
}

/// Parse `--with-colons` output into one entry per primary key.
///
/// Subkey fingerprints are skipped; the first `uid` wins.
fn parse_colons(text: &str) -> Vec<KeyInfo> {
    let mut keys = Vec::new();
    let mut current: Option<KeyInfo> = None;
    let mut in_primary = false;

    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let field = |idx: usize| fields.get(idx).copied().unwrap_or_default();

        match field(0) {
            kind @ ("pub" | "sec") => {
                keys.extend(current.take());
                current = Some(KeyInfo {
                    key_id: field(4).to_string(),
                    fingerprint: String::new(),
                    uid: String::new(),
                    created: parse_created(field(5)),
                    secret: kind == "sec",
                    protected: false,
                });
                in_primary = true;
            }
            "sub" | "ssb" => in_primary = false,
            "fpr" if in_primary => {
                if let Some(key) = current.as_mut() {
                    if key.fingerprint.is_empty() {
                        key.fingerprint = field(9).to_string();
                    }
                }
            }
            "uid" => {
                if let Some(key) = current.as_mut() {
                    if key.uid.is_empty() {
                        key.uid = unescape(field(9));
                    }
                }
            }
            _ => {}
        }
    }

    keys.extend(current);
    keys.retain(|key| !key.fingerprint.is_empty());
    keys
}

fn parse_created(field: &str) -> Option<DateTime<Utc>> {
    field
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Undo gpg's `\xNN` escaping in colon listings.
fn unescape(field: &str) -> String {
    field.replace("\\x3a", ":").replace("\\x5c", "\\")
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if text.is_empty() {
        format!("gpg exited with {}", output.status)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::key::KeySize;

    const COLONS: &str = "\
sec:u:4096:1:3AA5C34371567BD2:1760745600:::u:::scESC:::+:::23::0:
fpr:::::::::4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343:
grp:::::::::AAAA:
uid:u::::1760745600::HASH::Demo Project Key <project+demo@team.org>::::::::::0:
ssb:u:4096:1:42B317FD4BA89E7A:1760745600::::::e:::+:::23:
fpr:::::::::1111111111111111111111111111142B317FD4BA89E7A:
";

    #[test]
    fn test_parse_colons_reads_primary_key() {
        let keys = parse_colons(COLONS);
        assert_eq!(keys.len(), 1);

        let key = &keys[0];
        assert_eq!(key.key_id, "3AA5C34371567BD2");
        assert_eq!(key.fingerprint, "4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343");
        assert_eq!(key.uid, "Demo Project Key <project+demo@team.org>");
        assert!(key.secret);
        assert_eq!(key.created.unwrap().timestamp(), 1_760_745_600);
    }

    #[test]
    fn test_parse_colons_multiple_keys() {
        let text = format!(
            "{}pub:-:255:22:0BB1C2D3E4F50617:1760000000:::-:::scESC::::::23::0:\nfpr:::::::::99990BB1C2D3E4F50617:\nuid:-::::1760000000::H::Other\\x3a Key <o@team.org>::::::::::0:\n",
            COLONS
        );
        let keys = parse_colons(&text);
        assert_eq!(keys.len(), 2);
        assert!(!keys[1].secret);
        assert_eq!(keys[1].uid, "Other: Key <o@team.org>");
    }

    #[test]
    fn test_created_fingerprint_from_status() {
        let status = "[GNUPG:] PROGRESS primegen X 100 100\n[GNUPG:] KEY_CREATED B 4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343\n";
        assert_eq!(
            created_fingerprint(status).as_deref(),
            Some("4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343")
        );
        assert!(created_fingerprint("[GNUPG:] NOTHING\n").is_none());
    }

    #[test]
    fn test_key_params_rsa_without_passphrase() {
        let request = KeyRequest::for_project("Demo", Algorithm::Rsa(KeySize::Rsa3072));
        let params = key_params(&request);
        assert!(params.contains("Key-Type: RSA\nKey-Length: 3072\n"));
        assert!(params.contains("Name-Real: Demo Project Key\n"));
        assert!(params.contains("Name-Email: project+demo@team.org\n"));
        assert!(params.contains("%no-protection\n"));
        assert!(params.ends_with("%commit\n"));
    }

    #[test]
    fn test_key_params_ecc_with_passphrase() {
        let request = KeyRequest::for_project("Demo", Algorithm::Ecc)
            .with_passphrase(Some(Zeroizing::new("hunter2".to_string())));
        let params = key_params(&request);
        assert!(params.contains("Key-Curve: ed25519"));
        assert!(params.contains("Subkey-Curve: cv25519"));
        assert!(params.contains("Passphrase: hunter2\n"));
        assert!(!params.contains("%no-protection"));
    }

    #[test]
    fn test_delete_hint_uses_full_fingerprint() {
        let gpg = Gpg::with_home("/tmp/gnupg");
        assert_eq!(
            gpg.delete_hint("4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343"),
            "gpg --homedir /tmp/gnupg --delete-secret-and-public-key 4F1C0E7A9B2D3C4E5F60718293A4B5C63AA5C343"
        );
    }

    #[test]
    fn test_inspect_rejects_non_armored_input() {
        let err = Gpg::new().inspect("definitely not a key").unwrap_err();
        assert!(err.contains("armored"));
    }
}
