// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit taxonomy for the sync CLI.
//!
//! Outcomes map to fixed codes so scripts can branch on them: 0 success,
//! 1 conflicts present, 2 usage error, 3 remote or auth failure, 4 state
//! corruption. Commands return [`ExitError`] (usually via `?` on an
//! engine call) and `main()` performs the single `process::exit`.

use std::fmt;

use folio_engine::EngineError;
use folio_store::StateError;

pub const EXIT_CONFLICTS: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_REMOTE: i32 = 3;
pub const EXIT_STATE: i32 = 4;

/// A failed command, carrying the code the process exits with.
#[derive(Debug)]
pub struct ExitError {
    code: i32,
    message: String,
}

impl ExitError {
    /// Bad invocation, missing workspace, or unusable configuration.
    pub fn usage(message: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: message.into() }
    }

    /// The remote service is unreachable, throttling past the retry
    /// budget, or refusing our credential.
    pub fn remote(message: impl Into<String>) -> Self {
        Self { code: EXIT_REMOTE, message: message.into() }
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<EngineError> for ExitError {
    fn from(err: EngineError) -> Self {
        // Corrupt state is the only engine failure that earns its own
        // code; remote errors share 3, everything else reads as usage.
        let code = match &err {
            EngineError::State(StateError::Corrupt { .. }) => EXIT_STATE,
            EngineError::Remote(_) => EXIT_REMOTE,
            _ => EXIT_USAGE,
        };
        Self { code, message: err.to_string() }
    }
}
