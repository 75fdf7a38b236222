use popcorn_stream_core::core::{config, stream, torrents};
use std::{io, result};
use thiserror::Error;

/// The result type of the application.
pub type Result<T> = result::Result<T, Error>;

/// The errors which can occur while starting the application.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load the configuration, {0}")]
    Config(config::Error),
    #[error("failed to initialize the logger, {0}")]
    Logging(popcorn_stream_logging::Error),
    #[error("invalid host address {0}")]
    InvalidHost(String),
    #[error("failed to start the stream server, {0}")]
    Server(stream::Error),
    #[error("failed to start the torrent engine, {0}")]
    Torrent(torrents::Error),
}

impl From<config::Error> for Error {
    fn from(e: config::Error) -> Self {
        Self::Config(e)
    }
}

impl From<popcorn_stream_logging::Error> for Error {
    fn from(e: popcorn_stream_logging::Error) -> Self {
        Self::Logging(e)
    }
}

impl From<stream::Error> for Error {
    fn from(e: stream::Error) -> Self {
        Self::Server(e)
    }
}

impl From<torrents::Error> for Error {
    fn from(e: torrents::Error) -> Self {
        Self::Torrent(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        io::Error::other(e)
    }
}
