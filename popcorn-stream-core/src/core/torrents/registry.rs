use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use log::{debug, info, trace, warn};
use tokio::sync::{oneshot, Mutex};
use tokio::time;

use crate::core::torrents::{Error, Result, Torrent, TorrentEngine};
use crate::core::utils::time::{Clock, SystemClock};

const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(120);

/// The registry of active torrents.
///
/// It's the sole owner of the resolved torrents and deduplicates concurrent requests
/// for the same torrent source, which means that the engine is asked at most once to resolve a source
/// while it's present within the registry.
/// Every access refreshes the last access time of the torrent which is used by [TorrentRegistry::sweep_idle]
/// to destroy torrents that haven't been accessed for a while.
#[derive(Debug, Clone)]
pub struct TorrentRegistry {
    inner: Arc<InnerTorrentRegistry>,
}

impl TorrentRegistry {
    /// Returns a builder instance for the registry.
    pub fn builder() -> TorrentRegistryBuilder {
        TorrentRegistryBuilder::default()
    }

    /// Make sure a torrent session exists for the given source.
    ///
    /// When the source is already known, it returns immediately after refreshing the access time of the torrent.
    /// When the source is being resolved by another caller, it waits for that resolution to complete.
    /// Otherwise, the engine is requested to resolve the source.
    ///
    /// It returns `Ok` when the torrent is ready to be streamed, else the resolution error.
    pub async fn ensure_session(&self, source: &str) -> Result<()> {
        let receiver = {
            let mut entries = self.inner.entries.lock().await;
            match entries.get_mut(source) {
                Some(RegistryEntry::Active(session)) => {
                    trace!("Torrent {} is already active", source);
                    session.touch(self.inner.clock.now());
                    return Ok(());
                }
                Some(RegistryEntry::Resolving(waiters)) => {
                    debug!("Torrent {} is already being resolved, waiting for it", source);
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    rx
                }
                None => {
                    let (tx, rx) = oneshot::channel();
                    entries.insert(source.to_string(), RegistryEntry::Resolving(vec![tx]));

                    let inner = self.inner.clone();
                    let source = source.to_string();
                    tokio::spawn(async move {
                        inner.resolve(source).await;
                    });
                    rx
                }
            }
        };

        receiver.await.unwrap_or_else(|_| {
            Err(Error::ResolutionFailed(
                source.to_string(),
                "resolution has been aborted".to_string(),
            ))
        })
    }

    /// Retrieve the live torrent of the given source.
    /// This refreshes the last access time of the torrent.
    ///
    /// It returns [Error::NotFound] when the source is unknown, still resolving or has been evicted.
    pub async fn lookup(&self, source: &str) -> Result<Arc<dyn Torrent>> {
        let mut entries = self.inner.entries.lock().await;
        match entries.get_mut(source) {
            Some(RegistryEntry::Active(session)) => {
                session.touch(self.inner.clock.now());
                Ok(session.torrent.clone())
            }
            _ => Err(Error::NotFound(source.to_string())),
        }
    }

    /// Destroy and remove every torrent which hasn't been accessed for longer than the idle threshold at the given time.
    /// Torrents which are still being resolved are never swept.
    ///
    /// It returns the sources of the evicted torrents.
    pub async fn sweep_idle(&self, now: DateTime<Utc>, idle_threshold: Duration) -> Vec<String> {
        let threshold =
            chrono::Duration::from_std(idle_threshold).unwrap_or(chrono::Duration::MAX);
        let expired = {
            let mut entries = self.inner.entries.lock().await;
            let sources: Vec<String> = entries
                .iter()
                .filter_map(|(source, entry)| match entry {
                    RegistryEntry::Active(session) if session.is_idle(now, threshold) => {
                        Some(source.clone())
                    }
                    _ => None,
                })
                .collect();

            sources
                .into_iter()
                .filter_map(|source| match entries.remove(&source) {
                    Some(RegistryEntry::Active(session)) => Some((source, session.torrent)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };

        for (source, torrent) in expired.iter() {
            torrent.destroy().await;
            info!("Torrent {} has been destroyed", source);
        }

        expired.into_iter().map(|(source, _)| source).collect()
    }

    /// Sweep the idle torrents based on the current time of the registry clock.
    pub async fn evict_idle(&self, idle_threshold: Duration) -> Vec<String> {
        self.sweep_idle(self.inner.clock.now(), idle_threshold).await
    }

    /// Returns the number of active torrents.
    pub async fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .await
            .values()
            .filter(|e| matches!(e, RegistryEntry::Active(_)))
            .count()
    }

    /// Returns true when there are no active torrents.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Check if an active torrent exists for the given source.
    /// This doesn't refresh the access time of the torrent.
    pub async fn contains(&self, source: &str) -> bool {
        matches!(
            self.inner.entries.lock().await.get(source),
            Some(RegistryEntry::Active(_))
        )
    }

    /// Returns the last access time of the torrent for the given source, if active.
    pub async fn last_accessed(&self, source: &str) -> Option<DateTime<Utc>> {
        match self.inner.entries.lock().await.get(source) {
            Some(RegistryEntry::Active(session)) => Some(session.last_accessed_at),
            _ => None,
        }
    }
}

/// The builder of the [TorrentRegistry].
#[derive(Debug, Default)]
pub struct TorrentRegistryBuilder {
    engine: Option<Arc<dyn TorrentEngine>>,
    clock: Option<Arc<dyn Clock>>,
    resolve_timeout: Option<Duration>,
}

impl TorrentRegistryBuilder {
    /// Set the engine which resolves torrent sources.
    pub fn engine(mut self, engine: Arc<dyn TorrentEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the clock of the registry, defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the max time the engine gets to resolve a torrent source.
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }

    /// Create the registry.
    ///
    /// # Panics
    ///
    /// Panics if the engine is not set.
    pub fn build(self) -> TorrentRegistry {
        TorrentRegistry {
            inner: Arc::new(InnerTorrentRegistry {
                engine: self.engine.expect("expected an engine to have been set"),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                resolve_timeout: self.resolve_timeout.unwrap_or(DEFAULT_RESOLVE_TIMEOUT),
                entries: Default::default(),
            }),
        }
    }
}

/// An active torrent within the registry.
struct TorrentSession {
    torrent: Arc<dyn Torrent>,
    last_accessed_at: DateTime<Utc>,
}

impl TorrentSession {
    fn new(torrent: Arc<dyn Torrent>, now: DateTime<Utc>) -> Self {
        Self {
            torrent,
            last_accessed_at: now,
        }
    }

    /// Refresh the access time, the access time never moves backwards.
    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
    }

    fn is_idle(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_accessed_at) > threshold
    }
}

enum RegistryEntry {
    /// The source is being resolved by the engine, the senders are notified with the outcome.
    Resolving(Vec<oneshot::Sender<Result<()>>>),
    Active(TorrentSession),
}

impl Debug for RegistryEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEntry::Resolving(waiters) => write!(f, "Resolving({} waiters)", waiters.len()),
            RegistryEntry::Active(session) => write!(
                f,
                "Active({:?}, last accessed at {})",
                session.torrent, session.last_accessed_at
            ),
        }
    }
}

#[derive(Debug)]
struct InnerTorrentRegistry {
    engine: Arc<dyn TorrentEngine>,
    clock: Arc<dyn Clock>,
    resolve_timeout: Duration,
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl InnerTorrentRegistry {
    /// Resolve the source through the engine and hand the outcome to every waiting caller.
    async fn resolve(&self, source: String) {
        debug!("Resolving torrent {}", source);
        // a panicking engine should never leave the source stuck in the resolving state
        let resolution = AssertUnwindSafe(self.engine.add(source.as_str())).catch_unwind();
        let result = match time::timeout(self.resolve_timeout, resolution).await {
            Ok(Ok(Ok(torrent))) => Ok(Arc::<dyn Torrent>::from(torrent)),
            Ok(Ok(Err(e))) if e.is_resolution_failure() => Err(e),
            Ok(Ok(Err(e))) => Err(Error::ResolutionFailed(source.clone(), e.to_string())),
            Ok(Err(_)) => Err(Error::ResolutionFailed(
                source.clone(),
                "torrent engine panicked".to_string(),
            )),
            Err(_) => Err(Error::ResolutionTimeout(
                source.clone(),
                self.resolve_timeout.as_secs(),
            )),
        };

        let mut entries = self.entries.lock().await;
        let waiters = match entries.remove(&source) {
            Some(RegistryEntry::Resolving(waiters)) => waiters,
            _ => Vec::new(),
        };
        let outcome = match result {
            Ok(torrent) => {
                info!("Torrent {} is available", source);
                entries.insert(
                    source.clone(),
                    RegistryEntry::Active(TorrentSession::new(torrent, self.clock.now())),
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to resolve torrent {}, {}", source, e);
                Err(e)
            }
        };
        drop(entries);

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
