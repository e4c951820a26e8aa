// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface specs: usage, exit codes, and offline commands.
//!
//! Remote-backed behavior is covered in `folio-engine` against the
//! in-memory fake; these specs pin the binary's contract.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::process::Output;

use assert_cmd::Command;
use tempfile::TempDir;

/// One finished invocation, with chainable assertions.
struct Run {
    output: Output,
}

impl Run {
    fn passes(self) -> Self {
        assert!(
            self.output.status.success(),
            "expected success, got {:?}\nstderr: {}",
            self.output.status.code(),
            String::from_utf8_lossy(&self.output.stderr),
        );
        self
    }

    fn fails_with(self, code: i32) -> Self {
        assert_eq!(
            self.output.status.code(),
            Some(code),
            "stderr: {}",
            String::from_utf8_lossy(&self.output.stderr),
        );
        self
    }

    fn stdout_has(self, needle: &str) -> Self {
        let stdout = String::from_utf8_lossy(&self.output.stdout);
        assert!(stdout.contains(needle), "stdout missing {needle:?}:\n{stdout}");
        self
    }

    fn stderr_has(self, needle: &str) -> Self {
        let stderr = String::from_utf8_lossy(&self.output.stderr);
        assert!(stderr.contains(needle), "stderr missing {needle:?}:\n{stderr}");
        self
    }
}

/// An isolated config dir plus a scratch workspace dir.
struct Setup {
    config: TempDir,
    workspace: TempDir,
}

impl Setup {
    fn new() -> Self {
        Self {
            config: TempDir::new().unwrap(),
            workspace: TempDir::new().unwrap(),
        }
    }

    fn folio(&self, args: &[&str]) -> Run {
        let mut cmd = Command::cargo_bin("folio").unwrap();
        cmd.env("FOLIO_CONFIG_DIR", self.config.path());
        cmd.env_remove("FOLIO_TOKEN");
        cmd.env_remove("FOLIO_API_URL");
        cmd.args(args);
        Run { output: cmd.output().unwrap() }
    }

    fn folio_in_workspace(&self, args: &[&str]) -> Run {
        let mut cmd = Command::cargo_bin("folio").unwrap();
        cmd.env("FOLIO_CONFIG_DIR", self.config.path());
        cmd.env_remove("FOLIO_TOKEN");
        cmd.env_remove("FOLIO_API_URL");
        cmd.args(args);
        cmd.arg("--path").arg(self.workspace.path());
        Run { output: cmd.output().unwrap() }
    }

    fn init(&self) -> &Self {
        self.folio_in_workspace(&["init", "https://docs.example.com/w/root123"]).passes();
        self
    }

    fn workspace_file(&self, rel: &str) -> bool {
        self.workspace.path().join(rel).is_file()
    }

    fn registry_text(&self) -> String {
        std::fs::read_to_string(self.config.path().join("workspaces.toml")).unwrap_or_default()
    }
}

#[test]
fn no_args_is_a_usage_error() {
    Setup::new().folio(&[]).fails_with(2).stderr_has("Usage");
}

#[test]
fn help_shows_all_commands() {
    let mut run = Setup::new().folio(&["--help"]).passes();
    for command in ["init", "pull", "push", "sync", "status", "resolve", "watch", "list"] {
        run = run.stdout_has(command);
    }
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    Setup::new().folio(&["frobnicate"]).fails_with(2);
}

#[test]
fn init_creates_workspace_and_registers_it() {
    let setup = Setup::new();
    setup
        .folio_in_workspace(&["init", "https://docs.example.com/w/root123"])
        .passes()
        .stdout_has("root123");

    assert!(setup.workspace_file(".folio/config"));
    assert!(setup.registry_text().contains("root123"));
}

#[test]
fn init_twice_is_a_usage_error() {
    let setup = Setup::new();
    setup.init();
    setup
        .folio_in_workspace(&["init", "https://docs.example.com/w/other"])
        .fails_with(2)
        .stderr_has("already");
}

#[test]
fn init_without_a_document_id_is_a_usage_error() {
    let setup = Setup::new();
    setup.folio_in_workspace(&["init", "https://docs.example.com"]).fails_with(2);
}

#[test]
fn list_with_no_workspaces() {
    Setup::new().folio(&["list"]).passes().stdout_has("no workspaces configured");
}

#[test]
fn list_shows_registered_workspace() {
    let setup = Setup::new();
    setup.init();
    setup.folio(&["list"]).passes().stdout_has("root123");
}

#[test]
fn status_outside_a_workspace_is_a_usage_error() {
    let setup = Setup::new();
    let elsewhere = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("folio").unwrap();
    cmd.env("FOLIO_CONFIG_DIR", setup.config.path());
    cmd.env_remove("FOLIO_TOKEN");
    cmd.current_dir(elsewhere.path());
    cmd.arg("status");
    let run = Run { output: cmd.output().unwrap() };
    run.fails_with(2).stderr_has("workspace");
}

#[test]
fn pull_without_credentials_is_a_remote_failure() {
    let setup = Setup::new();
    setup.init();
    setup.folio_in_workspace(&["pull"]).fails_with(3).stderr_has("FOLIO_TOKEN");
}

#[test]
fn resolve_requires_exactly_one_resolution_flag() {
    let setup = Setup::new();
    setup.init();
    setup.folio_in_workspace(&["resolve", "Notes.md"]).fails_with(2);
    setup
        .folio_in_workspace(&["resolve", "Notes.md", "--keep-local", "--keep-remote"])
        .fails_with(2);
}

#[test]
fn version_prints() {
    Setup::new().folio(&["--version"]).passes().stdout_has("folio");
}
