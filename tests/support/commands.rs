//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a secret command with an isolated environment.
    ///
    /// - HOME set to the temporary home directory
    /// - Current directory set to the test project directory
    /// - Colors off and SECRET_LOG cleared
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("secret").expect("failed to find secret binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("SECRET_LOG");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `secret init` with the age backend and no passphrase.
    pub fn init_cmd(&self, name: &str) -> Output {
        self.cmd()
            .args(["init", "--backend", "age", "--name", name, "--no-passphrase"])
            .output()
            .expect("failed to run secret init")
    }

    /// Shortcut for `secret encrypt <path>`.
    pub fn encrypt(&self, path: &str) -> Output {
        self.cmd()
            .args(["encrypt", path])
            .output()
            .expect("failed to run secret encrypt")
    }

    /// Shortcut for `secret encrypt --all`.
    pub fn encrypt_all(&self) -> Output {
        self.cmd()
            .args(["encrypt", "--all"])
            .output()
            .expect("failed to run secret encrypt --all")
    }

    /// Shortcut for `secret decrypt <path>`.
    pub fn decrypt(&self, path: &str) -> Output {
        self.cmd()
            .args(["decrypt", path])
            .output()
            .expect("failed to run secret decrypt")
    }

    /// Shortcut for `secret decrypt --all`.
    pub fn decrypt_all(&self) -> Output {
        self.cmd()
            .args(["decrypt", "--all"])
            .output()
            .expect("failed to run secret decrypt --all")
    }

    /// Shortcut for `secret export`.
    pub fn export(&self) -> Output {
        self.cmd()
            .arg("export")
            .output()
            .expect("failed to run secret export")
    }

    /// Shortcut for `secret import <dir>`.
    pub fn import(&self, dir: &str) -> Output {
        self.cmd()
            .args(["import", dir])
            .output()
            .expect("failed to run secret import")
    }

    /// Shortcut for `secret delete-key` with extra flags.
    pub fn delete_key(&self, flags: &[&str]) -> Output {
        self.cmd()
            .arg("delete-key")
            .args(flags)
            .output()
            .expect("failed to run secret delete-key")
    }

    /// Shortcut for `secret check` with extra flags.
    pub fn check(&self, flags: &[&str]) -> Output {
        self.cmd()
            .arg("check")
            .args(flags)
            .output()
            .expect("failed to run secret check")
    }
}
