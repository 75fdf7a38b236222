use std::fmt::Debug;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use derive_more::Display;

use crate::core::torrents::Result;

/// The byte stream of a single torrent file.
pub type TorrentFileStream = Pin<Box<dyn futures::Stream<Item = io::Result<Bytes>> + Send>>;

/// The inclusive byte range within a torrent file, e.g. `0..=99` for the first 100 bytes.
pub type ByteRange = std::ops::RangeInclusive<u64>;

/// The information of a file within a torrent.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{} ({} bytes)", filename, length)]
pub struct TorrentFileInfo {
    /// The index of the file within the torrent, in engine order.
    pub index: usize,
    /// The name of the file.
    pub filename: String,
    /// The total length of the file in bytes.
    pub length: u64,
}

/// A live torrent which has been resolved by a [TorrentEngine].
#[async_trait]
pub trait Torrent: Debug + Send + Sync {
    /// Returns the source from which the torrent was resolved.
    fn source(&self) -> &str;

    /// Returns the files of the torrent in engine order.
    fn files(&self) -> Vec<TorrentFileInfo>;

    /// Open a byte stream for the given file.
    /// When a range is given, only the bytes within the inclusive range are streamed.
    ///
    /// It returns an error when the torrent has been destroyed.
    async fn open(
        &self,
        file: &TorrentFileInfo,
        range: Option<ByteRange>,
    ) -> Result<TorrentFileStream>;

    /// Destroy the torrent, releasing any resources held by it.
    async fn destroy(&self);
}

/// The engine which is able to resolve a torrent source, such as a magnet uri, into a [Torrent].
#[async_trait]
pub trait TorrentEngine: Debug + Send + Sync {
    /// Resolve the given torrent source.
    /// This might take an arbitrary amount of time as it depends on the availability of the source.
    async fn add(&self, source: &str) -> Result<Box<dyn Torrent>>;
}
