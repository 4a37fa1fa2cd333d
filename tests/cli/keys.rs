//! Tests for `secret export`, `secret import` and `secret delete-key`.

use std::fs;

use crate::support::*;

/// Copy the exported key pair of `from` into `to/<dir>`.
fn copy_backup(from: &Test, to: &Test, dir: &str) {
    fs::create_dir_all(to.path(dir)).unwrap();
    for name in ["demo.pub.asc", "demo.priv.asc"] {
        fs::copy(
            from.path(&format!(".secrets/backup/{}", name)),
            to.path(&format!("{}/{}", dir, name)),
        )
        .unwrap();
    }
}

#[test]
fn test_export_writes_slug_named_pair() {
    let t = Test::init("Demo");

    let output = t.export();
    assert_success(&output);
    assert_stdout_contains(&output, "demo.pub.asc");

    assert_eq!(t.read(".secrets/backup/demo.pub.asc"), t.read(".secret/public.asc"));
    assert_eq!(t.read(".secrets/backup/demo.priv.asc"), t.read(".secret/private.asc"));
}

#[test]
fn test_export_to_custom_dir() {
    let t = Test::init("My App");

    let output = t.cmd().args(["export", "--output", "out"]).output().unwrap();
    assert_success(&output);
    assert!(t.path("out/my_app.pub.asc").exists());
    assert!(t.path("out/my_app.priv.asc").exists());
}

#[test]
fn test_import_into_fresh_key_store() {
    let a = Test::init("Demo");
    a.write(".env", SAMPLE_ENV);
    assert_success(&a.encrypt(".env"));
    assert_success(&a.export());

    let b = Test::new();
    b.write(".secret/config.yaml", "backend: age\nproject_name: Demo\n");
    copy_backup(&a, &b, "keys");
    fs::copy(a.path(".env.age"), b.path(".env.age")).unwrap();

    let output = b.import("keys");
    assert_success(&output);
    assert_stdout_contains(&output, "imported key");
    assert_eq!(b.key_id(), a.key_id());

    assert_success(&b.decrypt(".env.age"));
    assert_eq!(b.read(".env"), SAMPLE_ENV);
}

#[test]
fn test_import_searches_project_root_by_default() {
    let a = Test::init("Demo");
    assert_success(&a.export());

    let b = Test::new();
    b.write(".secret/config.yaml", "backend: age\nproject_name: Demo\n");
    copy_backup(&a, &b, "nested/keys");

    let output = b.cmd().arg("import").output().unwrap();
    assert_success(&output);
    assert_eq!(b.key_id(), a.key_id());
}

#[test]
fn test_reimporting_active_key_is_harmless() {
    let t = Test::init("Demo");
    let key = t.key_id();
    assert_success(&t.export());

    assert_success(&t.import(".secrets/backup"));
    assert_success(&t.import(".secrets/backup"));
    assert_eq!(t.key_id(), key);
}

#[test]
fn test_import_over_different_key_needs_force() {
    let a = Test::init("Demo");
    assert_success(&a.export());

    let b = Test::init("Demo");
    let own = b.key_id();
    copy_backup(&a, &b, "keys");

    let output = b.import("keys");
    assert_failure(&output);
    assert_stderr_contains(&output, "a different key is already active");
    assert_stderr_contains(&output, "--force");
    assert_eq!(b.key_id(), own);

    let output = b.cmd().args(["import", "keys", "--force"]).output().unwrap();
    assert_success(&output);
    assert_eq!(b.key_id(), a.key_id());
}

#[test]
fn test_import_rejects_mismatched_halves() {
    let a = Test::init("Demo");
    let b = Test::init("Demo");

    let c = Test::new();
    c.write(".secret/config.yaml", "backend: age\nproject_name: Demo\n");
    c.write("keys/demo.pub.asc", &a.read(".secret/public.asc"));
    c.write("keys/demo.priv.asc", &b.read(".secret/private.asc"));

    let output = c.import("keys");
    assert_failure(&output);
    assert_stderr_contains(&output, "does not belong to private key");
    assert!(!c.path(".secret/private.asc").exists());
}

#[test]
fn test_import_without_key_files() {
    let t = Test::init("Demo");
    fs::create_dir(t.path("empty")).unwrap();

    let output = t.import("empty");
    assert_failure(&output);
    assert_stderr_contains(&output, "key files not found");
}

#[test]
fn test_delete_without_confirmation_keeps_everything() {
    let t = Test::init("Demo");
    let key = t.key_id();

    let output = t.delete_key(&[]);
    assert_success(&output);
    assert_stdout_contains(&output, "cancelled");
    assert_eq!(t.key_id(), key);
    assert!(t.path(".secret/private.asc").exists());
    assert!(!t.path(".secrets/backup").exists());
}

#[test]
fn test_delete_confirmed_on_stdin() {
    let t = Test::init("Demo");

    let output = t
        .cmd()
        .args(["delete-key", "--no-backup"])
        .write_stdin("y\n")
        .output()
        .unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "deleted key");
    assert!(!t.config().contains("gpg_key"));
}

#[test]
fn test_forced_delete_without_backup() {
    let t = Test::init("Demo");
    t.write(".env", "KEY=supersecret\n");
    assert_success(&t.encrypt(".env"));

    let output = t.delete_key(&["--force", "--no-backup"]);
    assert_success(&output);
    assert!(!t.config().contains("gpg_key"));
    assert!(!t.path(".secret/private.asc").exists());
    assert!(!t.path(".secret/public.asc").exists());
    assert!(!t.path(".secrets/backup").exists());

    let output = t.decrypt(".env.age");
    assert_failure(&output);
    assert_stderr_contains(&output, "no key configured");
}

#[test]
fn test_delete_backs_up_first() {
    let t = Test::init("Demo");
    let private = t.read(".secret/private.asc");

    let output = t.delete_key(&["--force"]);
    assert_success(&output);
    assert_stdout_contains(&output, "backed up to");
    assert_eq!(t.read(".secrets/backup/demo.priv.asc"), private);
}

#[test]
fn test_delete_missing_key_clears_config() {
    let t = Test::init("Demo");
    fs::remove_dir_all(t.home.path().join(".local/share/secret/age")).unwrap();

    let output = t.delete_key(&["--force"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "no longer exists in the key store");
    assert!(!t.config().contains("gpg_key"));
}
