//! Retention-based cleanup of dated log directories
//!
//! The sweeper scans the log root and deletes anything that should no longer
//! be there: dated directories older than the retention window, directories
//! whose names do not parse as dates (corrupt state), and loose files (the
//! layout has no loose files, so they are orphans). Before any directory is
//! deleted every cached logger's file sink is closed, never the other way
//! around, so no writer holds a handle into a directory being removed.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};

use crate::context::LogContext;
use crate::error::Result;
use crate::registry::ChannelRegistry;

const DATE_FORMAT: &str = "%Y%m%d";

/// Maintenance pass over a registry's log root.
pub struct RetentionSweeper {
    registry: Arc<ChannelRegistry>,
}

impl RetentionSweeper {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Delete dated directories older than `save_days` days (today counts as
    /// day one), plus any entry that does not belong in the layout. Returns
    /// the number of directories deleted. `save_days <= 0` is a no-op.
    ///
    /// Sinks that were closed to make deletion safe are not reopened; the
    /// next `open_log_file` re-creates today's directory on demand.
    pub fn delete_expired_log_dirs(&self, ctx: &LogContext, save_days: i64) -> Result<usize> {
        if save_days <= 0 {
            return Ok(0);
        }

        let root = ctx.resolve_log_root()?;
        let today = Local::now().date_naive();
        let cutoff = today
            .checked_sub_days(Days::new(save_days as u64 - 1))
            .unwrap_or(NaiveDate::MIN);

        self.sweep(&root, cutoff)
    }

    /// Delete the entire log root after evicting every logger (which closes
    /// all file sinks). A missing root is a no-op.
    pub fn delete_all(&self, ctx: &LogContext) -> Result<()> {
        let root = ctx.resolve_log_root()?;
        self.registry.remove_all();
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        Ok(())
    }

    fn sweep(&self, root: &Path, cutoff: NaiveDate) -> Result<usize> {
        let mut doomed_dirs = Vec::new();
        let mut doomed_files = Vec::new();

        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                // The layout holds only dated directories; loose files are
                // orphaned state.
                doomed_files.push(path);
                continue;
            }

            let name = entry.file_name();
            match name.to_str().map(parse_dated_name) {
                Some(Some(date)) if date >= cutoff => {}
                // Unparseable names are corrupt state, deleted regardless of
                // the retention window.
                _ => doomed_dirs.push(path),
            }
        }

        if doomed_dirs.is_empty() && doomed_files.is_empty() {
            return Ok(0);
        }

        // Quiesce every writer before the first directory goes away.
        if !doomed_dirs.is_empty() {
            self.registry.close_all_log_files();
        }

        for path in &doomed_files {
            if let Err(err) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %err, "failed to delete orphaned log file");
            }
        }

        let mut deleted = 0;
        for path in &doomed_dirs {
            match fs::remove_dir_all(path) {
                Ok(()) => deleted += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to delete expired log directory");
                }
            }
        }
        Ok(deleted)
    }
}

fn parse_dated_name(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, DATE_FORMAT).ok()
}
