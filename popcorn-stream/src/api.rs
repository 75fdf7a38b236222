use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, trace};
use popcorn_stream_core::core::sessions::{InMemorySessionStore, SessionStore, StreamSession};
use serde::{Deserialize, Serialize};

/// The request to create a new stream session.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CreateSessionRequest {
    /// The torrent source of the session.
    pub source: String,
}

/// The session information returned by the session api.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionResponse {
    pub id: String,
    pub source: String,
    pub status: String,
}

impl From<StreamSession> for SessionResponse {
    fn from(value: StreamSession) -> Self {
        Self {
            id: value.id,
            source: value.source,
            status: value.status.to_string(),
        }
    }
}

/// Returns the session api routes backed by the given store.
pub fn routes(store: Arc<InMemorySessionStore>) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .with_state(store)
}

async fn create_session(
    State(store): State<Arc<InMemorySessionStore>>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    let source = request.source.trim();
    if source.is_empty() {
        debug!("Rejecting session request without source");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let session = store.create(source).await;
    (StatusCode::CREATED, Json(SessionResponse::from(session))).into_response()
}

async fn get_session(
    State(store): State<Arc<InMemorySessionStore>>,
    Path(id): Path<String>,
) -> Response {
    match store.get(id.as_str()).await {
        Ok(session) => Json(SessionResponse::from(session)).into_response(),
        Err(e) => {
            trace!("Session lookup failed, {}", e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
