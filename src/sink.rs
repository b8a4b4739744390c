//! Dated, size-rotated file sink
//!
//! One sink owns one open log file inside a day-stamped directory
//! (`<log-root>/<YYYYMMDD>/<channel>.log`). The day stamp is fixed at creation
//! time; a sink opened before midnight keeps writing to yesterday's directory
//! until it is explicitly reopened. Rotation is size-bounded with exactly one
//! backup generation (`<channel>.log.0`).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::context::LogContext;
use crate::error::{LogError, Result};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Suffix appended to a channel name to form its log file name.
pub(crate) const FILE_SUFFIX: &str = ".log";

/// File sink rooted at one dated directory.
#[derive(Debug)]
pub(crate) struct DatedFileSink {
    dir: PathBuf,
    file_name: String,
    limit_mb: u64,
    limit_bytes: u64,
    written: u64,
    file: File,
}

impl DatedFileSink {
    /// Open today's log file for `channel`, creating the dated directory if
    /// absent. `limit_mb` must be non-zero and must not overflow when scaled
    /// to bytes; both are rejected before any file I/O.
    pub(crate) fn open(ctx: &LogContext, channel: &str, limit_mb: u64) -> Result<Self> {
        let limit_bytes = match limit_mb.checked_mul(BYTES_PER_MB) {
            Some(bytes) if limit_mb > 0 => bytes,
            _ => return Err(LogError::InvalidLimit(limit_mb)),
        };

        let root = ctx.resolve_log_root()?;
        let dir = root.join(Local::now().format("%Y%m%d").to_string());
        fs::create_dir_all(&dir).map_err(LogError::from)?;

        let file_name = format!("{channel}{FILE_SUFFIX}");
        let path = dir.join(&file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(LogError::from)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            dir,
            file_name,
            limit_mb,
            limit_bytes,
            written,
            file,
        })
    }

    /// Configured size limit, used for the open-with-same-limit no-op check.
    pub(crate) fn limit_mb(&self) -> u64 {
        self.limit_mb
    }

    /// Append one formatted line, rotating when the limit is reached.
    pub(crate) fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.written += line.len() as u64;

        if self.written >= self.limit_bytes {
            self.rotate()?;
        }
        Ok(())
    }

    /// Rename the active file to the single backup slot and start a fresh
    /// active file. The previous backup, if any, is replaced.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let active = self.dir.join(&self.file_name);
        let backup = self.dir.join(format!("{}.0", self.file_name));
        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(&active, &backup)?;

        self.file = OpenOptions::new().create(true).append(true).open(&active)?;
        self.written = 0;
        Ok(())
    }

    /// Flush and close the sink. The file handle is released when `self`
    /// drops; this exists so every teardown path closes deterministically.
    pub(crate) fn close(mut self) {
        let _ = self.file.flush();
    }

    /// Close the sink, then remove every file in its dated directory whose
    /// name is the channel's file name or is prefixed by it (the active file
    /// and its rotated backup). Sibling channels' files are never touched.
    pub(crate) fn delete(self) -> io::Result<()> {
        let dir = self.dir.clone();
        let prefix = self.file_name.clone();
        self.close();
        delete_prefixed_files(&dir, &prefix)
    }
}

fn delete_prefixed_files(dir: &Path, prefix: &str) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(prefix) && entry.path().is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
