//! Age provider.
//!
//! Embedded x25519 keys, no external tooling. Each key lives in the store
//! directory as two files named by fingerprint:
//!
//! ```text
//! ~/.local/share/secret/age/
//! ├── <FINGERPRINT>.pub    # recipient, world-readable
//! └── <FINGERPRINT>.key    # identity, mode 0600
//! ```
//!
//! Key material carries `# created:` and `# uid:` header comments so that
//! the files under `.secret/` are self-describing. A passphrase-protected
//! private half is the identity line encrypted with age's scrypt recipient
//! and ASCII-armored.

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use ::age::secrecy::{ExposeSecret, SecretString};
use ::age::x25519;
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::Provider;
use crate::core::constants::AGE_KEYRING_DIR;
use crate::core::key::{Algorithm, KeyInfo, KeyMaterial, KeyRequest};
use crate::core::project;
use crate::error::{CryptoError, KeyError, LookupError, Result, ValidationError};

const CREATED_HEADER: &str = "# created: ";
const UID_HEADER: &str = "# uid: ";
const PUBLIC_HEADER: &str = "# public key: ";
const SECRET_PREFIX: &str = "AGE-SECRET-KEY-";
const ARMOR_BEGIN: &str = "-----BEGIN AGE ENCRYPTED FILE-----";

/// Age provider with a file-backed key store
#[derive(Debug, Clone)]
pub struct Age {
    store: PathBuf,
}

impl Age {
    /// Provider over the store in the user's home directory.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            LookupError::ProviderUnavailable("cannot determine home directory".to_string())
        })?;
        Ok(Self::with_store(home.join(AGE_KEYRING_DIR)))
    }

    /// Provider over an explicit store directory.
    pub fn with_store(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
        }
    }

    fn public_path(&self, fingerprint: &str) -> PathBuf {
        self.store.join(format!("{}.pub", fingerprint))
    }

    fn private_path(&self, fingerprint: &str) -> PathBuf {
        self.store.join(format!("{}.key", fingerprint))
    }

    fn write_store(&self, material: &KeyMaterial) -> Result<()> {
        project::create_private_dir(&self.store).map_err(store_error)?;
        let fingerprint = &material.info.fingerprint;
        fs::write(self.public_path(fingerprint), &material.public).map_err(store_error)?;
        project::write_private(&self.private_path(fingerprint), material.private.as_bytes())
            .map_err(store_error)?;
        Ok(())
    }

    /// Fingerprints of every key in the store, sorted.
    fn fingerprints(&self) -> Result<Vec<String>> {
        if !self.store.exists() {
            return Ok(Vec::new());
        }
        let mut found: Vec<String> = fs::read_dir(&self.store)
            .map_err(store_error)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                match path.extension().and_then(|e| e.to_str()) {
                    Some("pub") => path.file_stem()?.to_str().map(str::to_string),
                    _ => None,
                }
            })
            .collect();
        found.sort();
        Ok(found)
    }

    fn load_info(&self, fingerprint: &str) -> Result<KeyInfo> {
        let public = fs::read_to_string(self.public_path(fingerprint)).map_err(store_error)?;
        let mut info = inspect_material(&public).map_err(KeyError::Store)?;

        let private_path = self.private_path(fingerprint);
        if private_path.exists() {
            let private =
                Zeroizing::new(fs::read_to_string(&private_path).map_err(store_error)?);
            let private_info = inspect_material(&private).map_err(KeyError::Store)?;
            info.secret = true;
            info.protected = private_info.protected;
        }
        Ok(info)
    }

    fn load_identity(&self, fingerprint: &str, passphrase: Option<&str>) -> Result<x25519::Identity> {
        let path = self.private_path(fingerprint);
        if !path.exists() {
            return Err(CryptoError::DecryptionFailed(format!(
                "private key {} is not in the age key store",
                fingerprint
            ))
            .into());
        }
        let private = Zeroizing::new(fs::read_to_string(&path).map_err(store_error)?);
        unlock_identity(&private, passphrase)
            .map_err(|e| CryptoError::DecryptionFailed(e).into())
    }
}

impl Provider for Age {
    fn name(&self) -> &'static str {
        "age"
    }

    fn suffix(&self) -> &'static str {
        ".age"
    }

    fn generate(&self, request: &KeyRequest) -> Result<KeyMaterial> {
        if let Algorithm::Rsa(_) = request.algorithm {
            return Err(ValidationError::UnsupportedAlgorithm {
                backend: "age",
                algorithm: request.algorithm.to_string(),
            }
            .into());
        }
        debug!(uid = %request.uid(), "generating age key");

        let identity = x25519::Identity::generate();
        let recipient = identity.to_public().to_string();
        let created = Utc::now();
        let uid = request.uid();

        let headers = format!(
            "{}{}\n{}{}\n",
            CREATED_HEADER,
            created.to_rfc3339_opts(SecondsFormat::Secs, true),
            UID_HEADER,
            uid
        );
        let public = format!("{}{}\n", headers, recipient);

        let secret = identity.to_string();
        let body = match request.passphrase() {
            Some(pass) => Zeroizing::new(
                seal_secret(secret.expose_secret(), pass).map_err(KeyError::Generation)?,
            ),
            None => Zeroizing::new(format!("{}\n", secret.expose_secret())),
        };
        let private = Zeroizing::new(format!(
            "{}{}{}\n{}",
            headers, PUBLIC_HEADER, recipient, *body
        ));

        let fingerprint = fingerprint(&recipient);
        let material = KeyMaterial {
            info: KeyInfo {
                key_id: key_id(&fingerprint),
                fingerprint,
                uid,
                created: Some(created),
                secret: true,
                protected: request.passphrase().is_some(),
            },
            public,
            private,
        };

        self.write_store(&material)?;
        debug!(key = %material.info.key_id, "age key generated");
        Ok(material)
    }

    fn inspect(&self, armored: &str) -> std::result::Result<KeyInfo, String> {
        inspect_material(armored)
    }

    fn install(&self, material: &KeyMaterial, passphrase: Option<&str>) -> Result<()> {
        let public = inspect_material(&material.public).map_err(KeyError::Store)?;
        let private = inspect_material(&material.private).map_err(KeyError::Store)?;
        if public.fingerprint != private.fingerprint || !private.secret {
            return Err(KeyError::Store("key halves do not form a pair".to_string()).into());
        }

        if private.protected {
            if let Some(pass) = passphrase {
                unlock_identity(&material.private, Some(pass)).map_err(KeyError::Store)?;
            }
        }

        debug!(key = %private.key_id, store = %self.store.display(), "installing age key");
        self.write_store(material)
    }

    fn list_secret_keys(&self) -> Result<String> {
        let mut out = String::new();
        for fingerprint in self.fingerprints()? {
            if !self.private_path(&fingerprint).exists() {
                continue;
            }
            let info = self.load_info(&fingerprint)?;
            let date = info
                .created
                .map(|c| c.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            out.push_str(&format!("sec   x25519/{} {} [E]\n", info.key_id, date));
            out.push_str(&format!("      {}\n", info.fingerprint));
            out.push_str(&format!("uid                 [ultimate] {}\n\n", info.uid));
        }
        Ok(out)
    }

    fn lookup(&self, key_id: &str) -> Result<KeyInfo> {
        let wanted = key_id.trim().to_uppercase();
        if wanted.is_empty() {
            return Err(LookupError::FingerprintNotFound(key_id.to_string()).into());
        }

        let mut matches: Vec<String> = self
            .fingerprints()?
            .into_iter()
            .filter(|fpr| fpr.ends_with(&wanted))
            .collect();

        match matches.len() {
            0 => Err(LookupError::FingerprintNotFound(key_id.to_string()).into()),
            1 => {
                let fingerprint = matches.remove(0);
                trace!(key = %key_id, fingerprint = %fingerprint, "resolved key");
                self.load_info(&fingerprint)
            }
            count => Err(LookupError::Ambiguous {
                key_id: key_id.to_string(),
                count,
            }
            .into()),
        }
    }

    fn delete(&self, fingerprint: &str) -> Result<()> {
        debug!(fingerprint = %fingerprint, "deleting age key");
        let failed = |reason: String| KeyError::DeleteFailed {
            fingerprint: fingerprint.to_string(),
            reason,
            remediation: self.delete_hint(fingerprint),
        };

        let public = self.public_path(fingerprint);
        let private = self.private_path(fingerprint);
        if !public.exists() && !private.exists() {
            return Err(failed("key is not in the age key store".to_string()).into());
        }
        for path in [private, public] {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| failed(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn delete_hint(&self, fingerprint: &str) -> String {
        format!(
            "rm {} {}",
            self.private_path(fingerprint).display(),
            self.public_path(fingerprint).display()
        )
    }

    fn encrypt(&self, fingerprint: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let public = fs::read_to_string(self.public_path(fingerprint))
            .map_err(|_| LookupError::FingerprintNotFound(fingerprint.to_string()))?;
        let recipient = recipient_line(&public)
            .ok_or_else(|| CryptoError::EncryptionFailed("no recipient in public key".to_string()))?
            .parse::<x25519::Recipient>()
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        trace!(plaintext_len = plaintext.len(), "encrypting with age");
        let encryptor =
            ::age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn ::age::Recipient))
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let encrypted = armor(encryptor, plaintext).map_err(CryptoError::EncryptionFailed)?;

        trace!(ciphertext_len = encrypted.len(), "encrypted with age");
        Ok(encrypted)
    }

    fn decrypt(
        &self,
        fingerprint: &str,
        ciphertext: &[u8],
        passphrase: Option<&str>,
    ) -> Result<Vec<u8>> {
        let identity = self.load_identity(fingerprint, passphrase)?;

        trace!(ciphertext_len = ciphertext.len(), "decrypting with age");
        let plaintext = open(ciphertext, &identity).map_err(CryptoError::DecryptionFailed)?;

        trace!(plaintext_len = plaintext.len(), "decrypted with age");
        Ok(plaintext)
    }
}

/// Upper-case hex SHA-256 of the recipient string.
fn fingerprint(recipient: &str) -> String {
    Sha256::digest(recipient.as_bytes())
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}

fn key_id(fingerprint: &str) -> String {
    fingerprint[fingerprint.len().saturating_sub(16)..].to_string()
}

fn header<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.lines()
        .find_map(|line| line.strip_prefix(name))
        .map(str::trim)
}

fn recipient_line(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with("age1"))
}

/// Decode age key material carrying our header comments.
fn inspect_material(text: &str) -> std::result::Result<KeyInfo, String> {
    let created = header(text, CREATED_HEADER)
        .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
        .map(|c| c.with_timezone(&Utc));
    let uid = header(text, UID_HEADER).unwrap_or_default().to_string();

    let secret_line = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(SECRET_PREFIX));
    let sealed = text.contains(ARMOR_BEGIN);

    let (recipient, secret, protected) = if let Some(line) = secret_line {
        let identity = line
            .parse::<x25519::Identity>()
            .map_err(|e| format!("invalid age identity: {}", e))?;
        let derived = identity.to_public().to_string();
        if let Some(claimed) = header(text, PUBLIC_HEADER) {
            if claimed != derived {
                return Err("public key header does not match identity".to_string());
            }
        }
        (derived, true, false)
    } else if sealed {
        let claimed = header(text, PUBLIC_HEADER)
            .ok_or_else(|| "protected key is missing its public key header".to_string())?;
        (claimed.to_string(), true, true)
    } else {
        let line = recipient_line(text).ok_or_else(|| "no age key found".to_string())?;
        (line.to_string(), false, false)
    };

    recipient
        .parse::<x25519::Recipient>()
        .map_err(|e| format!("invalid age recipient: {}", e))?;

    let fingerprint = fingerprint(&recipient);
    Ok(KeyInfo {
        key_id: key_id(&fingerprint),
        fingerprint,
        uid,
        created,
        secret,
        protected,
    })
}

/// Identity from private key material, unsealing it when protected.
fn unlock_identity(
    text: &str,
    passphrase: Option<&str>,
) -> std::result::Result<x25519::Identity, String> {
    let line = match text.find(ARMOR_BEGIN) {
        Some(start) => {
            let pass = passphrase.ok_or_else(|| "private key requires a passphrase".to_string())?;
            let scrypt = ::age::scrypt::Identity::new(SecretString::from(pass.to_string()));
            let opened = open(text[start..].as_bytes(), &scrypt)
                .map_err(|_| "incorrect passphrase".to_string())?;
            Zeroizing::new(String::from_utf8(opened).map_err(|e| format!("UTF-8 error: {}", e))?)
        }
        None => Zeroizing::new(
            text.lines()
                .map(str::trim)
                .find(|line| line.starts_with(SECRET_PREFIX))
                .ok_or_else(|| "no age identity in private key".to_string())?
                .to_string(),
        ),
    };
    line.trim()
        .parse::<x25519::Identity>()
        .map_err(|e| format!("invalid age identity: {}", e))
}

/// Encrypt the identity line under a passphrase.
fn seal_secret(secret: &str, passphrase: &str) -> std::result::Result<String, String> {
    let encryptor =
        ::age::Encryptor::with_user_passphrase(SecretString::from(passphrase.to_string()));
    let sealed = armor(encryptor, format!("{}\n", secret).as_bytes())?;
    String::from_utf8(sealed).map_err(|e| format!("UTF-8 error: {}", e))
}

fn armor(encryptor: ::age::Encryptor, plaintext: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(
            ::age::armor::ArmoredWriter::wrap_output(
                &mut encrypted,
                ::age::armor::Format::AsciiArmor,
            )
            .map_err(|e| e.to_string())?,
        )
        .map_err(|e| e.to_string())?;
    writer.write_all(plaintext).map_err(|e| e.to_string())?;
    writer
        .finish()
        .and_then(|armored| armored.finish())
        .map_err(|e| e.to_string())?;
    Ok(encrypted)
}

fn open(ciphertext: &[u8], identity: &dyn ::age::Identity) -> std::result::Result<Vec<u8>, String> {
    let reader = ::age::armor::ArmoredReader::new(ciphertext);
    let decryptor = ::age::Decryptor::new(reader).map_err(|e| e.to_string())?;
    let mut reader = decryptor
        .decrypt(std::iter::once(identity))
        .map_err(|e| e.to_string())?;

    let mut decrypted = Vec::new();
    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| e.to_string())?;
    Ok(decrypted)
}

fn store_error(err: std::io::Error) -> KeyError {
    KeyError::Store(err.to_string())
}
