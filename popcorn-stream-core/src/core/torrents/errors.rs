use std::{io, result};
use thiserror::Error;

/// The result type of the torrents module.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while managing torrents.
///
/// The error is cloneable as the outcome of a single resolution is shared with every caller
/// waiting on the same torrent source.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("failed to resolve torrent {0}, {1}")]
    ResolutionFailed(String, String),
    #[error("resolving torrent {0} timed out after {1}s")]
    ResolutionTimeout(String, u64),
    #[error("torrent {0} was not found")]
    NotFound(String),
    #[error("torrent {0} has been destroyed")]
    Destroyed(String),
    #[error("torrent file {0} was not found")]
    FileNotFound(usize),
    #[error("an io error occurred, {0}")]
    Io(String),
}

impl Error {
    /// Returns true when the error indicates the torrent source couldn't be resolved.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::ResolutionFailed(_, _) | Self::ResolutionTimeout(_, _))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ResolutionFailed(a, _), Self::ResolutionFailed(b, _)) => a == b,
            (Self::ResolutionTimeout(a, _), Self::ResolutionTimeout(b, _)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Destroyed(a), Self::Destroyed(b)) => a == b,
            (Self::FileNotFound(a), Self::FileNotFound(b)) => a == b,
            (Self::Io(_), Self::Io(_)) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
