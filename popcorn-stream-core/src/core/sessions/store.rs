use std::fmt::Debug;

use async_trait::async_trait;
use derive_more::Display;
use fx_callback::Callback;

use crate::core::sessions::Result;

/// The status of a stream session.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The torrent of the session is still being resolved.
    #[display("pending")]
    Pending,
    /// The torrent of the session is ready to be streamed.
    #[display("ready")]
    Ready,
}

/// A client facing session which correlates stream requests to a torrent source.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{} ({})", id, status)]
pub struct StreamSession {
    /// The unique identifier of the session.
    pub id: String,
    /// The torrent source of the session.
    pub source: String,
    pub status: SessionStatus,
}

/// The events published by a [SessionStore].
#[derive(Debug, Display, Clone, PartialEq)]
pub enum SessionEvent {
    /// Invoked when a new session has been created.
    #[display("Session {} has been created", _0)]
    Created(StreamSession),
}

/// The store which holds the stream sessions.
///
/// The store publishes a [SessionEvent::Created] for every new session through its subscriptions.
#[async_trait]
pub trait SessionStore: Debug + Callback<SessionEvent> + Send + Sync {
    /// Retrieve the session for the given identifier.
    ///
    /// It returns [crate::core::sessions::Error::NotFound] when the session doesn't exist.
    async fn get(&self, id: &str) -> Result<StreamSession>;

    /// Update the status of the given session.
    async fn set_status(&self, id: &str, status: SessionStatus) -> Result<()>;
}
