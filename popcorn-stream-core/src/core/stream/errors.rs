use std::{io, result};
use thiserror::Error;

use crate::core::{sessions, torrents};

/// The result type of the stream module.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while serving a stream.
#[derive(Debug, Error)]
pub enum Error {
    #[error("stream session {0} was not found")]
    SessionNotFound(String),
    #[error("torrent {0} was not found")]
    TorrentNotFound(String),
    #[error("torrent {0} has no file to stream")]
    NoFile(String),
    #[error("invalid stream range")]
    InvalidRange,
    #[error("stream parsing error occurred, {0}")]
    Parse(String),
    #[error("an io error occurred, {0}")]
    Io(io::Error),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SessionNotFound(a), Self::SessionNotFound(b)) => a == b,
            (Self::TorrentNotFound(a), Self::TorrentNotFound(b)) => a == b,
            (Self::NoFile(a), Self::NoFile(b)) => a == b,
            (Self::InvalidRange, Self::InvalidRange) => true,
            (Self::Parse(_), Self::Parse(_)) => true,
            (Self::Io(_), Self::Io(_)) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<sessions::Error> for Error {
    fn from(e: sessions::Error) -> Self {
        match e {
            sessions::Error::NotFound(id) => Self::SessionNotFound(id),
            sessions::Error::WriteFailed(_, _) => Self::Io(io::Error::other(e.to_string())),
        }
    }
}

impl From<torrents::Error> for Error {
    fn from(e: torrents::Error) -> Self {
        match e {
            torrents::Error::NotFound(source) | torrents::Error::Destroyed(source) => {
                Self::TorrentNotFound(source)
            }
            torrents::Error::FileNotFound(index) => Self::NoFile(index.to_string()),
            _ => Self::Io(io::Error::other(e.to_string())),
        }
    }
}
