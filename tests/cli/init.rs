//! Tests for `secret init`.

use crate::support::*;

#[test]
fn test_init_creates_config_and_keys() {
    let t = Test::new();

    let output = t.init_cmd("Demo");
    assert_success(&output);
    assert_stdout_contains(&output, "generated ecc (curve25519) key");

    let config = t.config();
    assert!(config.contains("backend: age"));
    assert!(config.contains("gpg_key: "));
    assert!(config.contains("project_name: Demo"));
    assert!(config.contains("- .env"));

    let private = t.read(".secret/private.asc");
    assert!(private.contains("AGE-SECRET-KEY-"));
    assert!(private.contains("# uid: Demo Project Key <project+demo@team.org>"));
    assert!(t.read(".secret/public.asc").contains("age1"));
}

#[cfg(unix)]
#[test]
fn test_init_restricts_key_permissions() {
    let t = Test::init("Demo");
    assert_private_mode(&t.path(".secret/private.asc"));
    assert_private_mode(&t.path(".secret/config.yaml"));
}

#[test]
fn test_init_protects_files_in_gitignore() {
    let t = Test::new();
    t.write(".gitignore", "target/\n");

    assert_success(&t.init_cmd("Demo"));

    let gitignore = t.read(".gitignore");
    assert!(gitignore.starts_with("target/\n"));
    assert!(gitignore.contains(".secret/private.asc"));
    assert!(gitignore.contains(".secrets/"));
    assert!(gitignore.contains("config.json"));
}

#[test]
fn test_init_twice_requires_force() {
    let t = Test::init("Demo");
    let first = t.key_id();

    let output = t.init_cmd("Demo");
    assert_failure(&output);
    assert_stderr_contains(&output, "already has an active key");
    assert_eq!(t.key_id(), first);

    let output = t
        .cmd()
        .args(["init", "--backend", "age", "--name", "Demo", "--no-passphrase", "--force"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_ne!(t.key_id(), first);
}

#[test]
fn test_init_custom_file_patterns() {
    let t = Test::new();

    let output = t
        .cmd()
        .args([
            "init",
            "--backend",
            "age",
            "--name",
            "Demo",
            "--files",
            "secrets/*.env,app.toml",
            "--no-passphrase",
        ])
        .output()
        .unwrap();
    assert_success(&output);

    let config = t.config();
    assert!(config.contains("secrets/*.env"));
    assert!(config.contains("app.toml"));
    assert!(!config.contains("dev.env"));
}

#[test]
fn test_init_age_rejects_rsa() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["init", "--backend", "age", "--algorithm", "rsa", "--no-passphrase"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "age backend does not support rsa4096 keys");
    assert!(!t.path(".secret/private.asc").exists());
}

#[test]
fn test_init_rejects_unknown_key_size() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["init", "--key-size", "1024", "--no-passphrase"])
        .output()
        .unwrap();
    assert_failure(&output);
}

#[test]
fn test_init_with_piped_passphrase() {
    let t = Test::new();

    let output = t
        .cmd()
        .args(["init", "--backend", "age", "--name", "Demo", "--passphrase"])
        .write_stdin("correct horse\n")
        .output()
        .unwrap();
    assert_success(&output);

    let private = t.read(".secret/private.asc");
    assert!(private.contains("-----BEGIN AGE ENCRYPTED FILE-----"));
    assert!(!private.contains("AGE-SECRET-KEY-"));
}
