use std::collections::HashMap;

use async_trait::async_trait;
use fx_callback::{Callback, MultiThreadedCallback, Subscription};
use log::{debug, trace};
use tokio::sync::RwLock;

use crate::core::sessions::{
    Error, Result, SessionEvent, SessionStatus, SessionStore, StreamSession,
};
use crate::core::Handle;

/// The session store which keeps the sessions within the process memory.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, StreamSession>>,
    callbacks: MultiThreadedCallback<SessionEvent>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Default::default(),
            callbacks: MultiThreadedCallback::new(),
        }
    }

    /// Create a new pending session for the given torrent source.
    /// Subscribers are informed about the new session through [SessionEvent::Created].
    ///
    /// It returns the created session.
    pub async fn create<S: Into<String>>(&self, source: S) -> StreamSession {
        let session = StreamSession {
            id: Handle::new().to_string(),
            source: source.into(),
            status: SessionStatus::Pending,
        };

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id.clone(), session.clone());
        }

        debug!("Session {} has been created for {}", session.id, session.source);
        self.callbacks.invoke(SessionEvent::Created(session.clone()));
        session
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true when the store has no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Callback<SessionEvent> for InMemorySessionStore {
    fn subscribe(&self) -> Subscription<SessionEvent> {
        self.callbacks.subscribe()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Result<StreamSession> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(Error::NotFound(id.to_string()))
    }

    async fn set_status(&self, id: &str, status: SessionStatus) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or(Error::NotFound(id.to_string()))?;

        trace!("Updating session {} status to {}", id, status);
        session.status = status;
        Ok(())
    }
}
