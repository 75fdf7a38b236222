use std::sync::Arc;

use async_trait::async_trait;
use log::trace;

use crate::core::torrents::{LocalTorrentEngine, Result, Torrent, TorrentEngine};

/// The torrent engine which delegates each source to the engine able to resolve it.
///
/// Local filesystem sources are resolved by the [LocalTorrentEngine],
/// every other source, such as magnet uris or torrent file urls, by the swarm engine.
#[derive(Debug)]
pub struct DefaultTorrentEngine {
    local: LocalTorrentEngine,
    swarm: Arc<dyn TorrentEngine>,
}

impl DefaultTorrentEngine {
    pub fn new(swarm: Arc<dyn TorrentEngine>) -> Self {
        Self {
            local: LocalTorrentEngine::new(),
            swarm,
        }
    }
}

#[async_trait]
impl TorrentEngine for DefaultTorrentEngine {
    async fn add(&self, source: &str) -> Result<Box<dyn Torrent>> {
        if LocalTorrentEngine::supports(source) {
            trace!("Delegating torrent source {} to the local engine", source);
            self.local.add(source).await
        } else {
            trace!("Delegating torrent source {} to the swarm engine", source);
            self.swarm.add(source).await
        }
    }
}
