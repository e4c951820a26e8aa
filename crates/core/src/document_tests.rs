// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_body_only() {
    let doc = Document::parse("hello world\n").unwrap();
    assert!(doc.properties.is_empty());
    assert_eq!(doc.body, "hello world\n");
}

#[test]
fn parse_frontmatter_and_body() {
    let doc = Document::parse("---\nstatus: Done\npriority: 2\n---\n\nbody text\n").unwrap();
    assert_eq!(doc.properties.len(), 2);
    assert_eq!(
        doc.properties.get("status"),
        Some(&serde_yaml::Value::String("Done".to_string()))
    );
    assert_eq!(doc.body, "body text\n");
}

#[test]
fn parse_unterminated_frontmatter_fails() {
    let err = Document::parse("---\nstatus: Done\nno closing fence\n").unwrap_err();
    assert!(matches!(err, DocumentError::UnterminatedFrontmatter));
}

#[test]
fn parse_invalid_yaml_fails() {
    let err = Document::parse("---\n: [unbalanced\n---\nbody\n").unwrap_err();
    assert!(matches!(err, DocumentError::Frontmatter(_)));
}

#[test]
fn render_sorts_property_keys() {
    let mut doc = Document::body_only("body\n");
    doc.properties.insert("zebra".to_string(), serde_yaml::Value::from(1));
    doc.properties.insert("alpha".to_string(), serde_yaml::Value::from(2));
    let out = doc.render().unwrap();
    let alpha = out.find("alpha").unwrap();
    let zebra = out.find("zebra").unwrap();
    assert!(alpha < zebra);
}

#[yare::parameterized(
    plain          = { "hello\n" },
    with_props     = { "---\na: 1\nb: two\n---\n\nbody\n" },
    props_no_body  = { "---\nkey: value\n---\n" },
    multi_para     = { "one\n\ntwo\n" },
)]
fn canonicalize_is_idempotent(input: &str) {
    let once = canonicalize(input).unwrap();
    let twice = canonicalize(&once).unwrap();
    assert_eq!(once, twice);
}

#[yare::parameterized(
    crlf            = { "a\r\nb\r\n", "a\nb\n" },
    missing_newline = { "hello", "hello\n" },
    extra_newlines  = { "hello\n\n\n", "hello\n" },
    empty           = { "", "" },
    only_newlines   = { "\n\n", "" },
)]
fn normalize_newlines_cases(input: &str, expected: &str) {
    assert_eq!(normalize_newlines(input), expected);
}

#[test]
fn roundtrip_stable_under_rewrite() {
    // hash(render(parse(x))) == hash(render(parse(render(parse(x)))))
    let input = "---\ntags:\n- a\n- b\n---\n\n# Title\n\ntext\r\n";
    let canonical = canonicalize(input).unwrap();
    assert_eq!(canonicalize(&canonical).unwrap(), canonical);
    assert!(canonical.ends_with('\n'));
    assert!(!canonical.contains('\r'));
}

#[yare::parameterized(
    plain     = { "Notes", "Notes" },
    slash     = { "a/b", "a-b" },
    backslash = { "a\\b", "a-b" },
    dots      = { "..hidden..", "hidden" },
    empty     = { "", "Untitled" },
    blank     = { "   ", "Untitled" },
)]
fn title_to_name_sanitizes(title: &str, expected: &str) {
    assert_eq!(title_to_name(title), expected);
}

#[test]
fn name_to_title_strips_extension() {
    assert_eq!(name_to_title("Notes.md"), "Notes");
    assert_eq!(name_to_title("_schema"), "_schema");
}
