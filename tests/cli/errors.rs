//! Error messages and hints.

use crate::support::*;

#[test]
fn test_commands_need_init() {
    let t = Test::new();
    t.write(".env", "A=1\n");

    for args in [&["encrypt", ".env"][..], &["decrypt", ".env.age"], &["export"]] {
        let output = t.cmd().args(args).output().unwrap();
        assert_failure(&output);
        assert_stderr_contains(&output, "project not initialized");
        assert_stderr_contains(&output, "run: secret init");
    }
}

#[test]
fn test_encrypt_missing_file() {
    let t = Test::init("Demo");

    let output = t.encrypt("nope.env");
    assert_failure(&output);
    assert_stderr_contains(&output, "file not found");
}

#[test]
fn test_decrypt_requires_ciphertext_suffix() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");

    let output = t.decrypt(".env");
    assert_failure(&output);
    assert_stderr_contains(&output, "is not a .age file");
}

#[test]
fn test_unknown_backend() {
    let t = Test::new();
    t.write(".secret/config.yaml", "backend: vault\n");

    let output = t.check(&[]);
    assert_failure(&output);
    assert_stderr_contains(&output, "unknown backend: vault");
}

#[test]
fn test_malformed_config() {
    let t = Test::new();
    t.write(".secret/config.yaml", "backend: [age\n");

    let output = t.encrypt_all();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse config");
}

#[test]
fn test_secrets_never_printed() {
    let t = Test::init("Demo");
    t.write(".env", SAMPLE_ENV);

    let output = t.cmd().args(["--verbose", "encrypt", ".env"]).output().unwrap();
    assert_success(&output);
    for secret in SAMPLE_SECRETS {
        assert_output_excludes(&output, secret);
    }
}

#[test]
fn test_completions() {
    let t = Test::new();

    let output = t.cmd().args(["completions", "bash"]).output().unwrap();
    assert_success(&output);
    assert_stdout_contains(&output, "secret");
}
