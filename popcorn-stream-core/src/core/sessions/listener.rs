use std::sync::Arc;

use fx_callback::Subscription;
use log::{debug, info, trace, warn};
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::sessions::{SessionEvent, SessionStatus, SessionStore, StreamSession};
use crate::core::torrents::TorrentRegistry;

/// The listener which prepares the torrent of every newly created session.
///
/// Each created session results in the torrent source being requested from the registry.
/// Once the torrent is ready, the status of the session is updated within the store.
/// The listener stops when it's dropped.
#[derive(Debug)]
pub struct SessionListener {
    cancellation_token: CancellationToken,
}

impl SessionListener {
    /// Start listening for the created sessions of the given store.
    pub fn new(store: Arc<dyn SessionStore>, registry: TorrentRegistry) -> Self {
        let cancellation_token = CancellationToken::new();
        let receiver = store.subscribe();
        let inner = InnerSessionListener {
            store,
            registry,
            cancellation_token: cancellation_token.clone(),
        };

        tokio::spawn(async move {
            inner.start(receiver).await;
        });

        Self { cancellation_token }
    }

    /// Stop listening for session events.
    /// Torrents which are already being prepared will still complete.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }
}

impl Drop for SessionListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone)]
struct InnerSessionListener {
    store: Arc<dyn SessionStore>,
    registry: TorrentRegistry,
    cancellation_token: CancellationToken,
}

impl InnerSessionListener {
    async fn start(&self, mut receiver: Subscription<SessionEvent>) {
        loop {
            select! {
                _ = self.cancellation_token.cancelled() => break,
                event = receiver.recv() => match event {
                    Ok(event) => self.handle_event(&*event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Session listener skipped {} session events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        debug!("Session listener main loop ended");
    }

    fn handle_event(&self, event: &SessionEvent) {
        trace!("Session listener received event {}", event);
        match event {
            SessionEvent::Created(session) => {
                let listener = self.clone();
                let session = session.clone();
                tokio::spawn(async move {
                    listener.prepare(session).await;
                });
            }
        }
    }

    async fn prepare(&self, session: StreamSession) {
        if let Err(e) = self.registry.ensure_session(session.source.as_str()).await {
            warn!("Torrent of session {} is not ready, {}", session.id, e);
            return;
        }

        match self
            .store
            .set_status(session.id.as_str(), SessionStatus::Ready)
            .await
        {
            Ok(_) => info!("Session {} is ready to be streamed", session.id),
            Err(e) => warn!("Failed to notify session {} ready, {}", session.id, e),
        }
    }
}
