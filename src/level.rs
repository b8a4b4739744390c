//! Log severity levels
//!
//! Levels are totally ordered; a sink emits a record when the record's level
//! is at or above the sink's configured level. `All` passes everything and is
//! the default wherever a level is left unset.

/// Severity of a log record, or a sink threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Threshold that passes every record.
    #[default]
    All,
    Debug,
    Info,
    Warning,
    Severe,
    /// Threshold that passes nothing.
    Off,
}

impl Level {
    /// Display name for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Severe => "SEVERE",
            Level::Off => "OFF",
        }
    }

    /// Whether a record at this level passes the given threshold.
    pub fn passes(&self, threshold: Level) -> bool {
        *self >= threshold
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::All < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Severe);
        assert!(Level::Severe < Level::Off);
    }

    #[test]
    fn test_passes_threshold() {
        assert!(Level::Info.passes(Level::All));
        assert!(Level::Info.passes(Level::Info));
        assert!(!Level::Info.passes(Level::Warning));
        assert!(!Level::Severe.passes(Level::Off));
    }
}
