//! Integration tests for the recast-run CLI
//!
//! Covers the startup failure paths that need no network: environment
//! parsing, config resolution, and credential loading. The happy path is
//! exercised against the mock client in librecast's integration tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_content = format!(
            r#"
[database.prod]
path = "{}"

[database.dev]
path = "{}"
"#,
            temp_dir.path().join("recast.db").display(),
            temp_dir.path().join("recast-dev.db").display()
        );

        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, config_content).unwrap();

        Self {
            _temp_dir: temp_dir,
            config_path,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("recast-run").unwrap();
        cmd.env("RECAST_CONFIG", &self.config_path);
        cmd.env_remove("TWITTER_BEARER_TOKEN");
        cmd.env_remove("TWITTER_BEARER_TOKEN_DEV");
        cmd
    }
}

#[test]
fn test_run_rejects_unknown_environment() {
    let env = TestEnv::new();

    env.cmd()
        .args(["--env", "staging"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown environment 'staging'"));
}

#[test]
fn test_run_missing_credentials() {
    let env = TestEnv::new();

    env.cmd()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Missing environment variable: TWITTER_BEARER_TOKEN",
        ));
}

#[test]
fn test_run_missing_dev_credentials_names_dev_variable() {
    let env = TestEnv::new();

    env.cmd()
        .args(["--env", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TWITTER_BEARER_TOKEN_DEV"));
}

#[test]
fn test_run_missing_config_fails() {
    let mut cmd = Command::cargo_bin("recast-run").unwrap();
    cmd.env("RECAST_CONFIG", "/nonexistent/recast/config.toml");
    cmd.env_remove("TWITTER_BEARER_TOKEN");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}
