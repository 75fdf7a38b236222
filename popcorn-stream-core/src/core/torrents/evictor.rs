use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::torrents::TorrentRegistry;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// The background task which periodically destroys idle torrents of the registry.
///
/// The eviction loop is stopped when the evictor is dropped.
#[derive(Debug)]
pub struct TorrentEvictor {
    registry: TorrentRegistry,
    sweep_interval: Duration,
    idle_threshold: Duration,
    started: AtomicBool,
    cancellation_token: CancellationToken,
}

impl TorrentEvictor {
    /// Create a new evictor for the given registry.
    ///
    /// # Arguments
    ///
    /// * `registry` - The registry to sweep.
    /// * `sweep_interval` - The time between two consecutive sweeps.
    /// * `idle_threshold` - The max time a torrent is allowed to not be accessed.
    pub fn new(registry: TorrentRegistry, sweep_interval: Duration, idle_threshold: Duration) -> Self {
        Self {
            registry,
            sweep_interval: sweep_interval.max(MIN_SWEEP_INTERVAL),
            idle_threshold,
            started: Default::default(),
            cancellation_token: Default::default(),
        }
    }

    /// Start the eviction loop in the background.
    /// The first sweep happens after one interval has elapsed.
    /// Starting an evictor which has already been started has no effect.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Torrent evictor has already been started");
            return;
        }

        let registry = self.registry.clone();
        let sweep_interval = self.sweep_interval;
        let idle_threshold = self.idle_threshold;
        let cancellation_token = self.cancellation_token.clone();

        debug!(
            "Starting torrent evictor with interval {:?} and threshold {:?}",
            sweep_interval, idle_threshold
        );
        tokio::spawn(async move {
            let mut interval =
                time::interval_at(time::Instant::now() + sweep_interval, sweep_interval);

            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    _ = interval.tick() => {
                        trace!("Sweeping idle torrents");
                        let evicted = registry.evict_idle(idle_threshold).await;
                        if !evicted.is_empty() {
                            info!("Evicted {} idle torrent(s)", evicted.len());
                        }
                    },
                }
            }

            debug!("Torrent evictor has been stopped");
        });
    }

    /// Stop the eviction loop.
    pub fn stop(&self) {
        trace!("Stopping torrent evictor");
        self.cancellation_token.cancel();
    }

    /// Returns true when the eviction loop has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

impl Drop for TorrentEvictor {
    fn drop(&mut self) {
        self.stop();
    }
}
