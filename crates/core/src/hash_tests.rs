// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn same_bytes_same_hash() {
    assert_eq!(ContentHash::of_bytes(b"hello\n"), ContentHash::of_str("hello\n"));
}

#[test]
fn different_bytes_different_hash() {
    assert_ne!(ContentHash::of_str("hello\n"), ContentHash::of_str("hello"));
}

#[test]
fn hex_roundtrip() {
    let h = ContentHash::of_str("round trip");
    let hex = h.to_hex();
    assert_eq!(hex.len(), 64);
    assert_eq!(ContentHash::from_hex(&hex), Some(h));
}

#[yare::parameterized(
    empty     = { "" },
    too_short = { "abcd" },
    non_hex   = { &"zz".repeat(32) },
)]
fn from_hex_rejects_invalid(input: &str) {
    assert!(ContentHash::from_hex(input).is_none());
}

#[test]
fn serde_roundtrip_as_hex_string() {
    let h = ContentHash::of_str("persisted");
    let json = serde_json::to_string(&h).unwrap();
    assert!(json.contains(&h.to_hex()));
    let parsed: ContentHash = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, h);
}

#[test]
fn short_is_prefix_of_hex() {
    let h = ContentHash::of_str("short");
    assert!(h.to_hex().starts_with(&h.short()));
    assert_eq!(h.short().len(), 12);
}
