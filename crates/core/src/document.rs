// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical document form: YAML frontmatter + markdown body.
//!
//! Everything that gets hashed or written to disk goes through this module,
//! so that the same content always produces the same bytes: LF line endings,
//! exactly one trailing newline, frontmatter keys in sorted order.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("frontmatter block opened with '---' but never closed")]
    UnterminatedFrontmatter,
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),
}

/// A parsed document: optional database properties plus markdown body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Frontmatter properties. Sorted map so rendering is deterministic.
    pub properties: BTreeMap<String, serde_yaml::Value>,
    pub body: String,
}

impl Document {
    pub fn body_only(body: impl Into<String>) -> Self {
        Self { properties: BTreeMap::new(), body: body.into() }
    }

    /// Split a file into frontmatter and body, then parse the frontmatter.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let (yaml, body) = split_frontmatter(text)?;
        let properties = match yaml {
            Some(yaml) => serde_yaml::from_str(yaml)?,
            None => BTreeMap::new(),
        };
        Ok(Self { properties, body: body.to_string() })
    }

    /// Render to canonical bytes.
    pub fn render(&self) -> Result<String, DocumentError> {
        let body = normalize_newlines(&self.body);
        if self.properties.is_empty() {
            return Ok(body);
        }
        let yaml = serde_yaml::to_string(&self.properties)?;
        if body.is_empty() {
            Ok(format!("---\n{}---\n", yaml))
        } else {
            Ok(format!("---\n{}---\n\n{}", yaml, body))
        }
    }
}

/// Parse-then-render: the canonical byte form of arbitrary input.
pub fn canonicalize(text: &str) -> Result<String, DocumentError> {
    Document::parse(text)?.render()
}

/// Split leading `---` fences off a document. Returns (frontmatter, body).
fn split_frontmatter(text: &str) -> Result<(Option<&str>, &str), DocumentError> {
    let rest = match text.strip_prefix("---\n").or_else(|| text.strip_prefix("---\r\n")) {
        Some(rest) => rest,
        None => return Ok((None, text)),
    };
    // Closing fence: a line that is exactly "---".
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &rest[..offset];
            let mut body = &rest[offset + line.len()..];
            // One blank separator line after the fence is formatting, not content.
            body = body.strip_prefix('\n').unwrap_or(body);
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }
    Err(DocumentError::UnterminatedFrontmatter)
}

/// LF line endings, trailing whitespace-only tail collapsed to one newline.
/// Empty input stays empty.
pub fn normalize_newlines(text: &str) -> String {
    let mut s = text.replace("\r\n", "\n");
    while s.ends_with('\n') {
        s.pop();
    }
    if s.is_empty() {
        return s;
    }
    s.push('\n');
    s
}

/// Derive the local file/directory name for a remote title.
///
/// Path separators and control characters are replaced, leading/trailing
/// dots and whitespace stripped. An empty result becomes "Untitled".
pub fn title_to_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Title of a local file: its stem.
pub fn name_to_title(file_name: &str) -> &str {
    file_name.strip_suffix(".md").unwrap_or(file_name)
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
