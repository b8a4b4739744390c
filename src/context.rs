//! Storage context: where log files live
//!
//! Models the host capability the core needs from its environment: resolve a
//! writable root directory. The external (shared/user-visible) directory is
//! preferred; the app-private directory is the fallback. All log data lives
//! under a fixed `flog/` directory inside whichever root wins.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LogError, Result};

/// Fixed name of the log root directory.
pub const LOG_DIR_NAME: &str = "flog";

/// Host-provided storage locations for log data.
#[derive(Debug, Clone)]
pub struct LogContext {
    external_dir: Option<PathBuf>,
    private_dir: PathBuf,
}

impl LogContext {
    /// Create a context with an optional external directory and a required
    /// private fallback directory.
    pub fn new(external_dir: Option<PathBuf>, private_dir: impl Into<PathBuf>) -> Self {
        Self {
            external_dir,
            private_dir: private_dir.into(),
        }
    }

    /// Context backed by a single directory, for hosts without split storage.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            external_dir: None,
            private_dir: dir.into(),
        }
    }

    /// Resolve the log root, creating it if absent.
    ///
    /// Prefers the external directory; falls back to the private one. Fails
    /// only when neither can be created.
    pub fn resolve_log_root(&self) -> Result<PathBuf> {
        if let Some(external) = &self.external_dir {
            let root = external.join(LOG_DIR_NAME);
            if ensure_dir(&root) {
                return Ok(root);
            }
        }

        let root = self.private_dir.join(LOG_DIR_NAME);
        if ensure_dir(&root) {
            return Ok(root);
        }

        Err(LogError::NoWritableRoot)
    }
}

fn ensure_dir(dir: &Path) -> bool {
    dir.is_dir() || fs::create_dir_all(dir).is_ok()
}
