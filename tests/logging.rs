//! Logging and verbosity tests.
//!
//! The default filter keeps stderr free of debug output; `--verbose` and
//! `SECRET_LOG` turn it on.

mod support;
use support::*;

#[test]
fn test_default_no_log_output() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");

    let output = t.encrypt(".env");
    assert_success(&output);

    let err = stderr(&output);
    assert!(
        !err.contains("DEBUG") && !err.contains("TRACE"),
        "default mode should not show debug/trace output: {}",
        err
    );
}

#[test]
fn test_verbose_flag_shows_debug_output() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");

    let output = t.cmd().args(["--verbose", "encrypt", ".env"]).output().unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "DEBUG");
    assert_stderr_contains(&output, "encrypting file");
}

#[test]
fn test_secret_log_env_var() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");

    let output = t
        .cmd()
        .env("SECRET_LOG", "secret=trace")
        .args(["encrypt", ".env"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_stderr_contains(&output, "TRACE");
}

#[test]
fn test_secret_log_overrides_verbose() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");

    let output = t
        .cmd()
        .env("SECRET_LOG", "secret=error")
        .args(["--verbose", "encrypt", ".env"])
        .output()
        .unwrap();
    assert_success(&output);
    assert!(!stderr(&output).contains("DEBUG"));
}

#[test]
fn test_logs_stay_off_stdout() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");

    let output = t.cmd().args(["--verbose", "encrypt", ".env"]).output().unwrap();
    assert_success(&output);
    assert!(!stdout(&output).contains("DEBUG"));
}
