//! flog - per-channel logging with dated, size-rotated files
//!
//! Each logical subsystem of an application declares a logging channel; the
//! [`ChannelRegistry`] hands out exactly one live [`Logger`] per channel,
//! constructed lazily and safe to request from any thread. A logger emits to
//! the process console sink (the `tracing` facade) and, once
//! [`Logger::open_log_file`] is called, also to a size-rotated file under a
//! day-stamped directory (`<log-root>/<YYYYMMDD>/<channel>.log`). The
//! [`RetentionSweeper`] deletes dated directories older than a retention
//! window, closing every open sink first.
//!
//! ```no_run
//! use std::sync::Arc;
//! use flog::{ChannelRegistry, LogContext, RetentionSweeper};
//!
//! let ctx = LogContext::with_dir("/var/lib/myapp");
//! let registry = Arc::new(ChannelRegistry::new(ctx.clone()));
//!
//! let logger = registry
//!     .get_or_init("network", |logger, ctx| logger.open_log_file(ctx, 50))
//!     .unwrap();
//! logger.info("connected");
//!
//! // Keep the last 7 days of logs.
//! let sweeper = RetentionSweeper::new(Arc::clone(&registry));
//! let deleted = sweeper.delete_expired_log_dirs(&ctx, 7).unwrap();
//! logger.info(&format!("sweep removed {deleted} directories"));
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod level;
pub mod logger;
pub mod record;
pub mod registry;
mod sink;
pub mod sweeper;

pub use builder::LineBuilder;
pub use context::{LogContext, LOG_DIR_NAME};
pub use error::{LogError, Result};
pub use level::Level;
pub use logger::Logger;
pub use record::{LogFormatter, LogRecord, SimpleFormatter};
pub use registry::{ChannelDef, ChannelRegistry};
pub use sweeper::RetentionSweeper;
