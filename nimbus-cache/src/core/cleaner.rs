//! Background maintenance task
//!
//! Every interval the cleaner snapshots the total entry count under one brief
//! read of the cache state, publishes it as the cached count, and announces
//! emptiness while the cache stays empty (one notification per tick).

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::{CacheError, Result};
use super::events::{EmptySource, EventDispatcher};

/// Intervals are clamped to this so the first deadline never overflows `Instant`
const MAX_INTERVAL: Duration = Duration::from_secs(86_400 * 365 * 30);

/// State the cleaner maintains
pub(crate) trait CleanerSource: Send + Sync + 'static {
    /// Active + dormant entry count, or `None` once the cache is disposed
    fn snapshot_total(&self) -> Option<usize>;

    /// Store the snapshot as the cached count
    fn publish_total(&self, total: usize);

    fn events(&self) -> &EventDispatcher;
}

/// Handle to the running cleaner task.
///
/// Dropping the handle closes the shutdown channel, which also ends the task.
pub(crate) struct Cleaner {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Cleaner {
    /// Spawn the cleaner on the current tokio runtime
    pub(crate) fn spawn<S: CleanerSource>(source: Arc<S>, interval: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        let interval = interval.min(MAX_INTERVAL);

        info!("Starting cache cleaner (interval={}ms)", interval.as_millis());
        let handle = runtime.spawn(Self::run(source, interval, shutdown_rx));

        Ok(Self { shutdown, handle })
    }

    async fn run<S: CleanerSource>(
        source: Arc<S>,
        interval: Duration,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => break,

                _ = ticker.tick() => {
                    if tick(source.as_ref()).is_none() {
                        break;
                    }
                }
            }
        }

        info!("Cache cleaner stopped");
    }

    /// Signal shutdown and wait for an in-flight tick to finish
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            warn!("Cache cleaner task ended abnormally: {}", e);
        }
    }
}

/// One maintenance pass; `None` when the cache is gone
pub(crate) fn tick<S: CleanerSource + ?Sized>(source: &S) -> Option<usize> {
    let total = source.snapshot_total()?;
    source.publish_total(total);

    if total == 0 {
        let delivered = source.events().notify(EmptySource::Cleaner);
        debug!("Cleaner tick: cache empty, {} subscribers notified", delivered);
    }

    Some(total)
}
