// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::path::PathBuf;

/// Credential for the remote service. Checked before the global config.
pub fn token() -> Option<String> {
    std::env::var("FOLIO_TOKEN").ok().filter(|s| !s.is_empty())
}

/// API base URL override.
pub fn api_url() -> Option<String> {
    std::env::var("FOLIO_API_URL").ok().filter(|s| !s.is_empty())
}

/// Log filter, `tracing_subscriber::EnvFilter` syntax.
pub fn log_filter(default: &str) -> String {
    std::env::var("FOLIO_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

/// Resolve config directory: FOLIO_CONFIG_DIR > <user config dir>/folio > ~/.config/folio
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FOLIO_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(base) = dirs::config_dir() {
        return base.join("folio");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config/folio")
}
