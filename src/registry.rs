//! Channel registry
//!
//! Owns the one-live-instance-per-channel invariant. A channel's logger is
//! constructed lazily on first request; its one-time setup callback runs
//! exactly once even when many threads race on an unseen key. Construction is
//! funneled through the registry (nothing else can build a [`Logger`]), and a
//! key under construction is parked in the map as a gate that racing callers
//! wait on, so the registry lock is never held across a slow setup.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::context::LogContext;
use crate::error::{LogError, Result};
use crate::level::Level;
use crate::logger::Logger;

/// Static declaration of a channel: its stable name plus the one-time setup
/// callback run when the registry constructs the channel's logger. The setup
/// typically enables file logging.
pub struct ChannelDef {
    pub name: &'static str,
    pub setup: fn(&Logger, &LogContext) -> Result<()>,
}

enum Slot {
    Ready(Arc<Logger>),
    Building(Arc<BuildGate>),
}

/// Rendezvous for callers racing on a key under construction. The builder
/// publishes the shared outcome; waiters block on the condvar until it lands.
#[derive(Default)]
struct BuildGate {
    result: Mutex<Option<Result<Arc<Logger>>>>,
    ready: Condvar,
}

impl BuildGate {
    fn publish(&self, outcome: Result<Arc<Logger>>) {
        let mut slot = match self.result.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<Arc<Logger>> {
        let mut slot = match self.result.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = match self.ready.wait(slot) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

struct RegistryInner {
    channels: HashMap<String, Slot>,
    default_level: Level,
}

/// Maps channel names to their single live logger instance.
///
/// Each registry is an independent, resettable unit owning its storage
/// context; there is no process-global state.
pub struct ChannelRegistry {
    ctx: LogContext,
    inner: Mutex<RegistryInner>,
}

impl ChannelRegistry {
    pub fn new(ctx: LogContext) -> Self {
        Self {
            ctx,
            inner: Mutex::new(RegistryInner {
                channels: HashMap::new(),
                default_level: Level::All,
            }),
        }
    }

    pub fn context(&self) -> &LogContext {
        &self.ctx
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Get the logger for a statically declared channel.
    pub fn get(&self, channel: &ChannelDef) -> Result<Arc<Logger>> {
        self.get_or_init(channel.name, channel.setup)
    }

    /// Get the cached logger for `name`, or construct it, running `setup`
    /// exactly once.
    ///
    /// When callers race on an unseen key exactly one runs `setup`; the
    /// others block and receive the same instance. A setup failure — whether
    /// it returns an error or panics — is handed to the builder and every
    /// waiter alike, and leaves nothing cached, so the next call retries
    /// cleanly.
    pub fn get_or_init<F>(&self, name: &str, setup: F) -> Result<Arc<Logger>>
    where
        F: FnOnce(&Logger, &LogContext) -> Result<()>,
    {
        validate_channel_name(name)?;

        let (gate, default_level) = {
            let mut inner = self.lock();
            match inner.channels.get(name) {
                Some(Slot::Ready(logger)) => return Ok(Arc::clone(logger)),
                Some(Slot::Building(gate)) => {
                    let gate = Arc::clone(gate);
                    drop(inner);
                    return gate.wait();
                }
                None => {
                    let gate = Arc::new(BuildGate::default());
                    inner
                        .channels
                        .insert(name.to_string(), Slot::Building(Arc::clone(&gate)));
                    (gate, inner.default_level)
                }
            }
        };

        // Registry lock released: a slow setup must not stall other channels.
        let logger = Arc::new(Logger::new(name, default_level));
        let mut unwind_guard = BuildGuard {
            registry: self,
            name,
            gate: &gate,
            armed: true,
        };
        let setup_result = setup(&logger, &self.ctx);
        unwind_guard.armed = false;
        drop(unwind_guard);
        let outcome = match setup_result {
            Ok(()) => Ok(logger),
            Err(err) => {
                // Tear down anything setup managed to open before failing.
                logger.tear_down();
                Err(LogError::ChannelSetup {
                    channel: name.to_string(),
                    source: Arc::new(err),
                })
            }
        };

        {
            let mut inner = self.lock();
            match &outcome {
                Ok(logger) => {
                    inner
                        .channels
                        .insert(name.to_string(), Slot::Ready(Arc::clone(logger)));
                }
                Err(_) => {
                    inner.channels.remove(name);
                }
            }
        }
        gate.publish(outcome.clone());
        outcome
    }

    /// Apply `level` to every cached instance and remember it as the default
    /// for instances created afterward. Runs under the registry lock, so no
    /// caller observes a mix of old and new levels across the snapshot.
    pub fn set_global_level(&self, level: Level) {
        let mut inner = self.lock();
        inner.default_level = level;
        for slot in inner.channels.values() {
            if let Slot::Ready(logger) = slot {
                logger.set_level(level);
            }
        }
    }

    /// Evict one channel, closing its file sink. Returns whether a cached
    /// instance was removed. Channels still under construction are left to
    /// finish.
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.lock();
        if !matches!(inner.channels.get(name), Some(Slot::Ready(_))) {
            return false;
        }
        match inner.channels.remove(name) {
            Some(Slot::Ready(logger)) => {
                logger.tear_down();
                true
            }
            _ => false,
        }
    }

    /// Evict every cached channel, closing all file sinks. No dangling open
    /// handles remain afterwards.
    pub fn remove_all(&self) {
        let mut inner = self.lock();
        inner.channels.retain(|_, slot| match slot {
            Slot::Ready(logger) => {
                logger.tear_down();
                false
            }
            Slot::Building(_) => true,
        });
    }

    /// Close (never delete) every cached instance's file sink. Used to
    /// quiesce writers before a directory they may hold is deleted; sinks are
    /// not reopened automatically.
    pub fn close_all_log_files(&self) {
        let inner = self.lock();
        for slot in inner.channels.values() {
            if let Slot::Ready(logger) = slot {
                logger.close_log_file(false);
            }
        }
    }

    /// Number of cached (fully constructed) channels.
    pub fn len(&self) -> usize {
        self.lock()
            .channels
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        self.remove_all();
    }
}

/// Releases a key parked as under-construction when the setup callback
/// unwinds. Without this a panicking setup would leave the `Building` slot in
/// the map with no publisher, wedging every later request for the key; the
/// guard evicts the slot and fails the gate's waiters before the panic
/// resumes. Disarmed once setup returns normally.
struct BuildGuard<'a> {
    registry: &'a ChannelRegistry,
    name: &'a str,
    gate: &'a Arc<BuildGate>,
    armed: bool,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.registry.lock().channels.remove(self.name);
        self.gate
            .publish(Err(LogError::ChannelSetupPanicked(self.name.to_string())));
    }
}

/// Channel names become file names; reject anything that would escape the
/// dated directory or collide with path components.
fn validate_channel_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(LogError::InvalidChannelName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn registry(tmp: &TempDir) -> ChannelRegistry {
        ChannelRegistry::new(LogContext::with_dir(tmp.path()))
    }

    #[test]
    fn test_get_caches_instance_and_runs_setup_once() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let setups = AtomicUsize::new(0);

        let first = registry
            .get_or_init("app", |_, _| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        let second = registry
            .get_or_init("app", |_, _| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(setups.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_gets_share_one_construction() {
        const THREADS: usize = 16;
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let setups = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        registry
                            .get_or_init("app", |_, _| {
                                setups.fetch_add(1, Ordering::SeqCst);
                                // Slow setup: keep the race window open.
                                std::thread::sleep(std::time::Duration::from_millis(20));
                                Ok(())
                            })
                            .unwrap()
                    })
                })
                .collect();

            let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            for logger in &loggers[1..] {
                assert!(Arc::ptr_eq(&loggers[0], logger));
            }
        });

        assert_eq!(setups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_setup_failure_propagates_to_waiters_and_retries_cleanly() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let barrier = Barrier::new(2);

        std::thread::scope(|scope| {
            let builder = scope.spawn(|| {
                registry.get_or_init("app", |_, _| {
                    barrier.wait();
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    Err(LogError::NoWritableRoot)
                })
            });
            let waiter = scope.spawn(|| {
                barrier.wait();
                registry.get_or_init("app", |_, _| Ok(()))
            });

            let builder_result = builder.join().unwrap();
            let waiter_result = waiter.join().unwrap();
            assert!(matches!(
                builder_result,
                Err(LogError::ChannelSetup { .. })
            ));
            // The waiter either raced onto the gate (shared failure) or ran
            // after the eviction and constructed cleanly.
            if let Err(err) = waiter_result {
                assert!(matches!(err, LogError::ChannelSetup { .. }));
            }
        });

        // Nothing stayed cached from the failed construction; the next call
        // constructs fresh.
        let setups = AtomicUsize::new(0);
        let logger = registry
            .get_or_init("app", |_, _| {
                setups.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert!(!logger.is_removed());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_setup_failure_closes_opened_sink() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);

        let result = registry.get_or_init("app", |logger, ctx| {
            logger.open_log_file(ctx, 1)?;
            logger.info("written before failure");
            Err(LogError::NoWritableRoot)
        });
        assert!(result.is_err());
        assert_eq!(registry.len(), 0);

        // All handles are closed: the whole log root can be removed.
        let root = registry.context().resolve_log_root().unwrap();
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_panicking_setup_releases_key() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.get_or_init("app", |_, _| -> crate::error::Result<()> {
                panic!("setup exploded")
            })
        }));
        assert!(panicked.is_err());
        assert_eq!(registry.len(), 0);

        // The key is not wedged: the next call constructs cleanly instead of
        // blocking on an abandoned gate.
        let logger = registry.get_or_init("app", |_, _| Ok(())).unwrap();
        assert_eq!(logger.name(), "app");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_panicking_setup_unblocks_waiters() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let barrier = Barrier::new(2);

        std::thread::scope(|scope| {
            let builder = scope.spawn(|| {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    registry.get_or_init("app", |_, _| -> crate::error::Result<()> {
                        barrier.wait();
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        panic!("setup exploded")
                    })
                }));
            });
            let waiter = scope.spawn(|| {
                barrier.wait();
                registry.get_or_init("app", |_, _| Ok(()))
            });

            builder.join().unwrap();
            // The waiter either raced onto the gate (and got the panic
            // error) or ran after the eviction and constructed cleanly;
            // either way it returned.
            if let Err(err) = waiter.join().unwrap() {
                assert!(matches!(err, LogError::ChannelSetupPanicked(_)));
            }
        });
    }

    #[test]
    fn test_global_level_applies_to_all_and_to_future_instances() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let a = registry.get_or_init("a", |_, _| Ok(())).unwrap();
        let b = registry.get_or_init("b", |_, _| Ok(())).unwrap();

        registry.set_global_level(Level::Warning);
        assert_eq!(a.level(), Level::Warning);
        assert_eq!(b.level(), Level::Warning);

        let c = registry.get_or_init("c", |_, _| Ok(())).unwrap();
        assert_eq!(c.level(), Level::Warning);
    }

    #[test]
    fn test_remove_evicts_and_next_get_constructs_new() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let first = registry.get_or_init("app", |_, _| Ok(())).unwrap();

        assert!(registry.remove("app"));
        assert!(first.is_removed());
        assert!(!registry.remove("app"));

        let second = registry.get_or_init("app", |_, _| Ok(())).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_remove_all_leaves_no_open_handles() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        for name in ["a", "b", "c"] {
            registry
                .get_or_init(name, |logger, ctx| {
                    logger.open_log_file(ctx, 1)?;
                    logger.info("hello");
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(registry.len(), 3);

        registry.remove_all();
        assert_eq!(registry.len(), 0);

        let root = registry.context().resolve_log_root().unwrap();
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_invalid_channel_names_rejected() {
        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        for name in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(
                registry.get_or_init(name, |_, _| Ok(())),
                Err(LogError::InvalidChannelName(_))
            ));
        }
    }

    #[test]
    fn test_static_channel_def() {
        static APP: ChannelDef = ChannelDef {
            name: "app",
            setup: |logger, ctx| logger.open_log_file(ctx, 10),
        };

        let tmp = TempDir::new().unwrap();
        let registry = registry(&tmp);
        let logger = registry.get(&APP).unwrap();
        assert_eq!(logger.name(), "app");
        logger.info("via static def");
    }
}
