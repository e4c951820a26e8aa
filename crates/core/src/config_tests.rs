// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn save_and_load_roundtrip() {
    let dir = tempdir().unwrap();
    let mut config = WorkspaceConfig::new(RemoteId::new("root-1"));
    config.remote_url = Some("https://docs.example.com/root-1".to_string());
    config.save(dir.path()).unwrap();

    let loaded = WorkspaceConfig::load(dir.path()).unwrap();
    assert_eq!(loaded.remote_root, RemoteId::new("root-1"));
    assert_eq!(loaded.remote_url.as_deref(), Some("https://docs.example.com/root-1"));
    assert_eq!(loaded.poll_interval_secs, 30);
    assert_eq!(loaded.debounce_secs, 2);
}

#[test]
fn load_without_meta_dir_is_not_a_workspace() {
    let dir = tempdir().unwrap();
    let err = WorkspaceConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotAWorkspace));
}

#[test]
fn defaults_fill_missing_fields() {
    let dir = tempdir().unwrap();
    let meta = dir.path().join(META_DIR);
    std::fs::create_dir_all(&meta).unwrap();
    std::fs::write(meta.join(CONFIG_FILE), "remote_root = \"root-9\"\n").unwrap();

    let loaded = WorkspaceConfig::load(dir.path()).unwrap();
    assert_eq!(loaded.poll_interval_secs, 30);
    assert_eq!(loaded.debounce_secs, 2);
}

#[test]
fn discover_walks_up_from_nested_dir() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(META_DIR)).unwrap();
    let nested = dir.path().join("Projects/Deep");
    std::fs::create_dir_all(&nested).unwrap();

    let found = discover_workspace(&nested).unwrap();
    assert_eq!(found, dir.path());
}

#[test]
fn discover_returns_none_outside_workspace() {
    let dir = tempdir().unwrap();
    assert!(discover_workspace(dir.path()).is_none());
}
