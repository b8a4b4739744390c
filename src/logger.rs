//! Per-channel logger facade
//!
//! A `Logger` wraps the console sink (the `tracing` facade, with the channel
//! name attached to every event) and optionally one [`DatedFileSink`]. All
//! configuration and emission serialize on the instance's own mutex, so
//! emission always sees a consistent sink set and never writes into a
//! half-closed sink.
//!
//! Loggers are created only by the [`ChannelRegistry`](crate::ChannelRegistry);
//! there is exactly one live instance per channel.

use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::LogContext;
use crate::error::{LogError, Result};
use crate::level::Level;
use crate::record::{LogFormatter, LogRecord, SimpleFormatter};
use crate::sink::DatedFileSink;

pub struct Logger {
    name: String,
    state: Mutex<LoggerState>,
}

struct LoggerState {
    level: Level,
    file_level: Option<Level>,
    formatter: Arc<dyn LogFormatter>,
    file_sink: Option<DatedFileSink>,
    removed: bool,
}

impl Logger {
    pub(crate) fn new(name: &str, level: Level) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(LoggerState {
                level,
                file_level: None,
                formatter: Arc::new(SimpleFormatter),
                file_sink: None,
                removed: false,
            }),
        }
    }

    /// Name of the channel this logger belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    // A panic in one emitter must not brick the channel for everyone else.
    fn lock(&self) -> MutexGuard<'_, LoggerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current minimum severity for the console sink.
    pub fn level(&self) -> Level {
        self.lock().level
    }

    /// Set the minimum severity passed to the sinks. Does not rewrite
    /// anything already on disk.
    pub fn set_level(&self, level: Level) {
        let mut state = self.lock();
        if state.removed {
            return;
        }
        state.level = level;
    }

    /// Override the file sink's level independently of the console level.
    /// `None` defers to the logger-wide level.
    pub fn set_file_level(&self, level: Option<Level>) {
        let mut state = self.lock();
        if state.removed {
            return;
        }
        state.file_level = level;
    }

    /// Replace the formatter used for file lines.
    pub fn set_formatter(&self, formatter: Arc<dyn LogFormatter>) {
        let mut state = self.lock();
        if state.removed {
            return;
        }
        state.formatter = formatter;
    }

    /// Whether a record at `level` would reach the console sink.
    pub fn is_loggable(&self, level: Level) -> bool {
        let state = self.lock();
        !state.removed && level.passes(state.level)
    }

    /// Enable file logging with the given size limit in megabytes.
    ///
    /// No-op if a file sink is already open with the same limit. A different
    /// limit closes the old sink before opening the new one. An invalid limit
    /// (zero, or overflowing when scaled to bytes) is rejected synchronously;
    /// I/O failure is non-fatal: it is reported to the console sink once and
    /// the logger stays console-only.
    pub fn open_log_file(&self, ctx: &LogContext, limit_mb: u64) -> Result<()> {
        if limit_mb == 0 || limit_mb.checked_mul(1024 * 1024).is_none() {
            return Err(LogError::InvalidLimit(limit_mb));
        }

        let mut state = self.lock();
        if state.removed {
            return Ok(());
        }
        if let Some(sink) = &state.file_sink {
            if sink.limit_mb() == limit_mb {
                return Ok(());
            }
        }
        if let Some(old) = state.file_sink.take() {
            old.close();
        }

        match DatedFileSink::open(ctx, &self.name, limit_mb) {
            Ok(sink) => {
                state.file_sink = Some(sink);
            }
            Err(err) => {
                tracing::warn!(
                    channel = %self.name,
                    error = %err,
                    "failed to open log file, file logging disabled"
                );
            }
        }
        Ok(())
    }

    /// Flush and detach the file sink. With `delete`, additionally remove the
    /// sink's own backing files from disk; other channels' files in the same
    /// dated directory are untouched.
    pub fn close_log_file(&self, delete: bool) {
        let mut state = self.lock();
        let Some(sink) = state.file_sink.take() else {
            return;
        };
        if delete {
            if let Err(err) = sink.delete() {
                tracing::warn!(channel = %self.name, error = %err, "failed to delete log files");
            }
        } else {
            sink.close();
        }
    }

    pub fn info(&self, msg: &str) {
        self.log(Level::Info, msg, None);
    }

    pub fn warning(&self, msg: &str) {
        self.log(Level::Warning, msg, None);
    }

    pub fn severe(&self, msg: &str) {
        self.log(Level::Severe, msg, None);
    }

    /// Log at severe level with an attached error.
    pub fn severe_with(&self, msg: &str, error: &(dyn Error + 'static)) {
        self.log(Level::Severe, msg, Some(error));
    }

    /// Emit one record to every attached sink at or above its effective
    /// level. Empty messages are dropped. Emission never returns an error; a
    /// failed file write is reported once and drops the logger back to
    /// console-only.
    pub fn log(&self, level: Level, msg: &str, error: Option<&(dyn Error + 'static)>) {
        if msg.is_empty() {
            return;
        }
        let mut state = self.lock();
        if state.removed {
            return;
        }

        let record = LogRecord::new(level, &self.name, msg, error);

        if level.passes(state.level) {
            emit_to_console(&record);
        }

        let file_level = state.file_level.unwrap_or(state.level);
        if level.passes(file_level) {
            let formatter = Arc::clone(&state.formatter);
            let mut write_failed = false;
            if let Some(sink) = state.file_sink.as_mut() {
                let line = formatter.format(&record);
                if let Err(err) = sink.write_line(&line) {
                    tracing::warn!(
                        channel = %self.name,
                        error = %err,
                        "log file write failed, file logging disabled"
                    );
                    write_failed = true;
                }
            }
            if write_failed {
                // Dropping the sink closes the handle.
                state.file_sink = None;
            }
        }
    }

    /// Registry eviction path: mark removed and close the file sink. Every
    /// call on a removed logger is a no-op afterwards.
    pub(crate) fn tear_down(&self) {
        let mut state = self.lock();
        if state.removed {
            return;
        }
        state.removed = true;
        if let Some(sink) = state.file_sink.take() {
            sink.close();
        }
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.lock().removed
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &state.level)
            .field("file_sink", &state.file_sink.is_some())
            .field("removed", &state.removed)
            .finish()
    }
}

fn emit_to_console(record: &LogRecord<'_>) {
    match record.level {
        Level::Severe => match record.error {
            Some(err) => {
                tracing::error!(channel = record.channel, error = %err, "{}", record.message)
            }
            None => tracing::error!(channel = record.channel, "{}", record.message),
        },
        Level::Warning => tracing::warn!(channel = record.channel, "{}", record.message),
        Level::Debug => tracing::debug!(channel = record.channel, "{}", record.message),
        _ => tracing::info!(channel = record.channel, "{}", record.message),
    }
}
