use std::{io, result};
use thiserror::Error;

/// The result type of the config module.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file, {0}")]
    Io(io::Error),
    #[error("config file is invalid, {0}")]
    Parse(String),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Io(_), Self::Io(_)) => true,
            (Self::Parse(_), Self::Parse(_)) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
