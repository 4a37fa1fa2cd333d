//! Tests for `secret check`.

use std::fs;

use crate::support::*;

#[test]
fn test_check_reports_active_key() {
    let t = Test::init("Demo");
    let key = t.key_id();

    let output = t.check(&[]);
    assert_success(&output);
    assert_stdout_contains(&output, &key);
    assert_stdout_contains(&output, "Demo Project Key <project+demo@team.org>");
    assert_stdout_contains(&output, "encryption:");
}

#[test]
fn test_check_json() {
    let t = Test::init("Demo");

    let output = t.check(&["--json"]);
    assert_success(&output);

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["backend"], "age");
    assert_eq!(report["project"], "Demo");
    assert_eq!(report["configured"], true);
    assert_eq!(report["key"]["key_id"], t.key_id().as_str());
    assert!(report["checks"]
        .as_array()
        .unwrap()
        .iter()
        .all(|c| c["ok"] == true));
}

#[test]
fn test_check_all_lists_keys() {
    let t = Test::init("Demo");

    let output = t.check(&["--all"]);
    assert_success(&output);
    assert_stdout_contains(&output, &format!("sec   x25519/{}", t.key_id()));
    assert_stdout_contains(&output, "uid                 [ultimate] Demo Project Key");
}

#[test]
fn test_check_detects_key_without_config_entry() {
    let t = Test::init("Demo");
    let key = t.key_id();
    t.write(".secret/config.yaml", "backend: age\nproject_name: Demo\n");

    let output = t.check(&[]);
    assert_success(&output);
    assert_stdout_contains(&output, &key);
    assert_stderr_contains(&output, "key detected by name");
}

#[cfg(unix)]
#[test]
fn test_check_flags_loose_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let t = Test::init("Demo");
    fs::set_permissions(
        t.path(".secret/private.asc"),
        fs::Permissions::from_mode(0o644),
    )
    .unwrap();

    let output = t.check(&[]);
    assert_success(&output);
    assert_stderr_contains(&output, "expected 600");
}

#[test]
fn test_check_without_any_key() {
    let t = Test::new();
    t.write(".secret/config.yaml", "backend: age\nproject_name: Demo\n");

    let output = t.check(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "could not detect a key for project 'Demo'");
}
