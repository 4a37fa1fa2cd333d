//! Tests for `secret encrypt` and `secret decrypt`.

use std::fs;

use crate::support::*;

#[test]
fn test_encrypt_writes_ciphertext_and_example() {
    let t = Test::init("Demo");
    t.write(".env", "KEY=supersecret\n");

    let output = t.encrypt(".env");
    assert_success(&output);
    assert_stdout_contains(&output, ".env.age");

    let ciphertext = t.read(".env.age");
    assert!(ciphertext.starts_with("-----BEGIN AGE ENCRYPTED FILE-----"));
    assert!(!ciphertext.contains("supersecret"));
    assert_eq!(t.read(".env.example"), "KEY=<placeholder>\n");
}

#[test]
fn test_decrypt_restores_plaintext() {
    let t = Test::init("Demo");
    t.write(".env", SAMPLE_ENV);
    assert_success(&t.encrypt(".env"));
    fs::remove_file(t.path(".env")).unwrap();

    let output = t.decrypt(".env.age");
    assert_success(&output);
    assert_eq!(t.read(".env"), SAMPLE_ENV);
}

#[test]
fn test_example_hides_every_value() {
    let t = Test::init("Demo");
    t.write(".env", SAMPLE_ENV);
    t.write("config.json", SAMPLE_JSON);
    t.write(".config.yaml", SAMPLE_YAML);

    assert_success(&t.encrypt_all());

    assert_eq!(t.read(".env.example"), SAMPLE_ENV_EXAMPLE);
    let examples = [
        t.read(".env.example"),
        t.read("config.example.json"),
        t.read(".config.example.yaml"),
    ];
    for example in &examples {
        for secret in SAMPLE_SECRETS {
            assert!(!example.contains(secret), "{} leaked into {}", secret, example);
        }
    }

    let json: serde_json::Value = serde_json::from_str(&examples[1]).unwrap();
    assert_eq!(json["stripe"]["retries"], 3);
}

#[test]
fn test_regenerating_example_is_stable() {
    let t = Test::init("Demo");
    t.write("config.json", SAMPLE_JSON);

    assert_success(&t.encrypt("config.json"));
    let first = t.read("config.example.json");
    assert_success(&t.encrypt("config.json"));
    assert_eq!(t.read("config.example.json"), first);
}

#[test]
fn test_encrypt_all_reports_progress() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");
    t.write("dev.env", "B=2\n");
    t.write("config.json", "{\"c\": \"3\"}\n");

    let output = t.encrypt_all();
    assert_success(&output);
    assert_stdout_contains(&output, "processed 3 of 3 files");
    assert!(t.path(".env.age").exists());
    assert!(t.path("dev.env.age").exists());
    assert!(t.path("config.json.age").exists());
    assert!(!t.path(".env.example.age").exists());
}

#[test]
fn test_encrypt_all_continues_past_a_bad_file() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");
    t.write("dev.env", "B=2\n");
    // a directory matches the pattern but can't be read as a file
    fs::create_dir(t.path("config.json")).unwrap();

    let output = t.encrypt_all();
    assert_success(&output);
    assert_stdout_contains(&output, "processed 2 of 3 files");
    assert_stderr_contains(&output, "config.json");
    assert!(t.path(".env.age").exists());
    assert!(t.path("dev.env.age").exists());
}

#[test]
fn test_decrypt_all_roundtrip() {
    let t = Test::init("Demo");
    t.write(".env", SAMPLE_ENV);
    t.write("config.json", SAMPLE_JSON);
    assert_success(&t.encrypt_all());
    fs::remove_file(t.path(".env")).unwrap();
    fs::remove_file(t.path("config.json")).unwrap();

    let output = t.decrypt_all();
    assert_success(&output);
    assert_stdout_contains(&output, "processed 2 of 2 files");
    assert_eq!(t.read(".env"), SAMPLE_ENV);
    assert_eq!(t.read("config.json"), SAMPLE_JSON);
}

#[test]
fn test_encrypt_all_with_no_matches() {
    let t = Test::init("Demo");

    let output = t.encrypt_all();
    assert_success(&output);
    assert_stdout_contains(&output, "no files matched");
}

#[test]
fn test_secret_dir_is_pattern_base() {
    let t = Test::init("Demo");
    let config = t.config();
    t.write(".secret/config.yaml", &format!("{}secret_dir: env\n", config));
    t.write("env/.env", "A=1\n");
    t.write(".env", "B=2\n");

    let output = t.encrypt_all();
    assert_success(&output);
    assert!(t.path("env/.env.age").exists());
    assert!(!t.path(".env.age").exists());
}

#[test]
fn test_encrypt_with_explicit_key() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");
    let key = t.key_id();

    let output = t
        .cmd()
        .args(["encrypt", ".env", "--key", &key])
        .output()
        .unwrap();
    assert_success(&output);

    let output = t
        .cmd()
        .args(["encrypt", ".env", "--key", "0000000000000000"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "no fingerprint found for key 0000000000000000");
    assert_stderr_contains(&output, "--key");
}

#[test]
fn test_protected_key_reads_passphrase_from_stdin() {
    let t = Test::new();
    let output = t
        .cmd()
        .args(["init", "--backend", "age", "--name", "Demo", "--passphrase"])
        .write_stdin("correct horse\n")
        .output()
        .unwrap();
    assert_success(&output);

    t.write(".env", "KEY=supersecret\n");
    assert_success(&t.encrypt(".env"));
    fs::remove_file(t.path(".env")).unwrap();

    let output = t
        .cmd()
        .args(["decrypt", ".env.age"])
        .write_stdin("wrong horse\n")
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "decryption failed");
    assert!(!t.path(".env").exists());

    let output = t
        .cmd()
        .args(["decrypt", ".env.age"])
        .write_stdin("correct horse\n")
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(t.read(".env"), "KEY=supersecret\n");
}

#[test]
fn test_encrypt_all_counts_file_when_only_example_fails() {
    let t = Test::init("Demo");
    t.write(".env", "A=1\n");
    fs::create_dir(t.path(".env.example")).unwrap();

    let output = t.encrypt_all();
    assert_success(&output);
    assert_stdout_contains(&output, "processed 1 of 1 files");
    assert_stderr_contains(&output, "failed to write example file");
    assert!(t.path(".env.age").exists());
}
