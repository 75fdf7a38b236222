use thiserror::Error;

/// The result type of the sessions module.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interacting with the session store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("session {0} was not found")]
    NotFound(String),
    #[error("failed to write session {0}, {1}")]
    WriteFailed(String, String),
}
