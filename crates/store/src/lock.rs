// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative workspace lock.
//!
//! One engine per workspace: the lock file under `.folio/` holds an advisory
//! exclusive lock plus the owner's PID for diagnostics.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use folio_core::config::{LOCK_FILE, META_DIR};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("workspace is locked by another folio process")]
    Held(#[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Held for the lifetime of a sync run or watch session. Released on drop.
pub struct WorkspaceLock {
    file: std::fs::File,
    path: PathBuf,
}

impl WorkspaceLock {
    pub fn acquire(workspace_root: &Path) -> Result<Self, LockError> {
        let dir = workspace_root.join(META_DIR);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(LOCK_FILE);

        // Open without truncating so a failed acquire never wipes the
        // holder's PID.
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive().map_err(LockError::Held)?;

        // Write PID now that we hold the lock
        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
