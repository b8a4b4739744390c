//! Log records and the line formatter strategy
//!
//! A [`LogRecord`] is the structured form of one emission; a [`LogFormatter`]
//! turns it into a single terminated text line for the file sink. Formatting
//! is a pure function of the record, called once per emitted record per sink.

use std::error::Error;

use chrono::{DateTime, Local};

use crate::level::Level;

/// One log emission, borrowed from the call site.
#[derive(Debug)]
pub struct LogRecord<'a> {
    /// Wall-clock time the record was created.
    pub timestamp: DateTime<Local>,
    /// Severity of the record.
    pub level: Level,
    /// Name of the channel that produced the record.
    pub channel: &'a str,
    /// Log message.
    pub message: &'a str,
    /// Optional error attached to the record.
    pub error: Option<&'a (dyn Error + 'static)>,
}

impl<'a> LogRecord<'a> {
    pub fn new(
        level: Level,
        channel: &'a str,
        message: &'a str,
        error: Option<&'a (dyn Error + 'static)>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            channel,
            message,
            error,
        }
    }
}

/// Strategy turning a record into one newline-terminated line.
///
/// Implementations must be callable from multiple threads; keep any scratch
/// state local to the call.
pub trait LogFormatter: Send + Sync {
    fn format(&self, record: &LogRecord<'_>) -> String;
}

/// Default line format: `MMdd HH:mm:ss.mmm<marker><message><error-chain>`.
///
/// Info records carry a bare space as marker so the common case stays short;
/// other levels get a compact parenthesized tag.
#[derive(Debug, Default)]
pub struct SimpleFormatter;

impl SimpleFormatter {
    fn level_marker(level: Level) -> &'static str {
        match level {
            Level::Info => " ",
            Level::Warning => "(w)",
            Level::Severe => "(s)",
            Level::Debug => "(d)",
            Level::All => "(all)",
            Level::Off => "(off)",
        }
    }
}

impl LogFormatter for SimpleFormatter {
    fn format(&self, record: &LogRecord<'_>) -> String {
        let mut line = String::with_capacity(record.message.len() + 32);
        line.push_str(&record.timestamp.format("%m%d %H:%M:%S%.3f").to_string());
        line.push_str(Self::level_marker(record.level));
        line.push_str(record.message);

        // Append the error and its source chain on continuation lines.
        let mut error = record.error;
        while let Some(err) = error {
            line.push_str("\n  caused by: ");
            line.push_str(&err.to_string());
            error = err.source();
        }

        line.push('\n');
        line
    }
}
