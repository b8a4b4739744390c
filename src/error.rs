//! Error type for configuration and maintenance operations
//!
//! Log emission itself never returns an error; only configuration calls
//! (`open_log_file`, registry construction) and sweep operations do. The type
//! is `Clone` so a channel construction failure can be handed to every caller
//! that raced on the same key.

use std::io;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LogError {
    /// File size limit was zero or would overflow when converted to bytes.
    #[error("invalid log file size limit: {0} MB")]
    InvalidLimit(u64),

    /// Channel name is empty or not usable as a file name.
    #[error("invalid channel name: {0:?}")]
    InvalidChannelName(String),

    /// Neither the external nor the private storage directory is writable.
    #[error("no writable log root available")]
    NoWritableRoot,

    /// The one-time setup callback of a channel failed; nothing was cached.
    #[error("setup for channel {channel:?} failed: {source}")]
    ChannelSetup {
        channel: String,
        #[source]
        source: Arc<LogError>,
    },

    /// The one-time setup callback of a channel panicked; the key was
    /// released and nothing was cached.
    #[error("setup for channel {0:?} panicked")]
    ChannelSetupPanicked(String),

    #[error("{0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for LogError {
    fn from(err: io::Error) -> Self {
        LogError::Io(Arc::new(err))
    }
}

pub type Result<T, E = LogError> = std::result::Result<T, E>;
