// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn load_missing_files_gives_defaults() {
    let dir = tempdir().unwrap();
    assert!(GlobalConfig::load(dir.path()).unwrap().token.is_none());
    assert!(Registry::load(dir.path()).unwrap().workspaces.is_empty());
}

#[test]
fn add_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let mut registry = Registry::default();
    registry.add(PathBuf::from("/tmp/notes"), "root-1".to_string());
    registry.save(dir.path()).unwrap();

    let loaded = Registry::load(dir.path()).unwrap();
    assert_eq!(loaded.workspaces.len(), 1);
    assert_eq!(loaded.workspaces[0].remote_root, "root-1");
}

#[test]
fn re_adding_a_path_replaces_the_entry() {
    let mut registry = Registry::default();
    registry.add(PathBuf::from("/tmp/notes"), "root-1".to_string());
    registry.add(PathBuf::from("/tmp/notes"), "root-2".to_string());
    assert_eq!(registry.workspaces.len(), 1);
    assert_eq!(registry.workspaces[0].remote_root, "root-2");
}

#[test]
fn invalid_registry_file_is_a_usage_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("workspaces.toml"), "not [valid toml").unwrap();
    let err = Registry::load(dir.path()).unwrap_err();
    assert_eq!(err.code(), crate::exit_error::EXIT_USAGE);
}
