use std::fmt::{Debug, Formatter};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use librqbit::api::TorrentIdOrHash;
use librqbit::{AddTorrent, AddTorrentOptions, ManagedTorrent, Session};
use log::{debug, info, trace, warn};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::core::torrents::{
    ByteRange, Error, Result, Torrent, TorrentEngine, TorrentFileInfo, TorrentFileStream,
};

const STREAM_BUFFER_SIZE: usize = 256 * 1000;

/// The torrent engine which resolves magnet uris and torrent file urls through a librqbit session.
pub struct RqbitTorrentEngine {
    session: Arc<Session>,
    storage_path: PathBuf,
}

impl RqbitTorrentEngine {
    /// Create a new engine which stores the torrent data within the given directory.
    pub async fn new<P: AsRef<Path>>(storage_path: P) -> Result<Self> {
        let storage_path = storage_path.as_ref().to_path_buf();
        trace!("Creating torrent session within {:?}", storage_path);
        let session = Session::new(storage_path.clone())
            .await
            .map_err(|e| Error::Io(e.to_string()))?;

        info!("Torrent session has been started within {:?}", storage_path);
        Ok(Self {
            session,
            storage_path,
        })
    }

    /// Returns the files of the torrent in the order of its metadata.
    fn files(handle: &ManagedTorrent) -> Vec<TorrentFileInfo> {
        if let Some(metadata) = &*handle.metadata.load() {
            match metadata.info.iter_file_details() {
                Ok(files) => {
                    return files
                        .enumerate()
                        .map(|(index, file)| TorrentFileInfo {
                            index,
                            filename: file
                                .filename
                                .to_string()
                                .map(|e| Self::filename(e.as_str()))
                                .unwrap_or_default(),
                            length: file.len,
                        })
                        .collect();
                }
                Err(e) => warn!("Failed to read the torrent files, {}", e),
            }
        }

        Vec::new()
    }

    /// Strip the torrent directories from the given file path.
    fn filename(path: &str) -> String {
        path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
    }
}

impl Debug for RqbitTorrentEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RqbitTorrentEngine")
            .field("storage_path", &self.storage_path)
            .finish()
    }
}

#[async_trait]
impl TorrentEngine for RqbitTorrentEngine {
    async fn add(&self, source: &str) -> Result<Box<dyn Torrent>> {
        trace!("Adding torrent source {} to the session", source);
        let options = AddTorrentOptions {
            overwrite: true,
            ..Default::default()
        };
        let response = self
            .session
            .add_torrent(AddTorrent::from_url(source), Some(options))
            .await
            .map_err(|e| Error::ResolutionFailed(source.to_string(), e.to_string()))?;
        let handle = response.into_handle().ok_or_else(|| {
            Error::ResolutionFailed(source.to_string(), "torrent is not managed".to_string())
        })?;
        handle
            .wait_until_initialized()
            .await
            .map_err(|e| Error::ResolutionFailed(source.to_string(), e.to_string()))?;

        let files = Self::files(&handle);
        debug!(
            "Resolved torrent {} with {} file(s)",
            source,
            files.len()
        );
        Ok(Box::new(RqbitTorrent {
            source: source.to_string(),
            session: self.session.clone(),
            handle,
            files,
            destroyed: AtomicBool::new(false),
        }))
    }
}

/// A torrent which is managed by a librqbit session.
pub struct RqbitTorrent {
    source: String,
    session: Arc<Session>,
    handle: Arc<ManagedTorrent>,
    files: Vec<TorrentFileInfo>,
    destroyed: AtomicBool,
}

impl Debug for RqbitTorrent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RqbitTorrent")
            .field("source", &self.source)
            .field("id", &self.handle.id())
            .field("files", &self.files)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[async_trait]
impl Torrent for RqbitTorrent {
    fn source(&self) -> &str {
        self.source.as_str()
    }

    fn files(&self) -> Vec<TorrentFileInfo> {
        self.files.clone()
    }

    async fn open(
        &self,
        file: &TorrentFileInfo,
        range: Option<ByteRange>,
    ) -> Result<TorrentFileStream> {
        if self.destroyed.load(Ordering::Relaxed) {
            return Err(Error::Destroyed(self.source.clone()));
        }

        let file_length = self
            .files
            .get(file.index)
            .map(|e| e.length)
            .ok_or(Error::FileNotFound(file.index))?;
        let (start, end) = match range {
            Some(range) => (*range.start(), (*range.end()).min(file_length.saturating_sub(1))),
            None => (0, file_length.saturating_sub(1)),
        };
        let length = if file_length == 0 || start > end {
            0
        } else {
            end - start + 1
        };

        trace!(
            "Opening torrent {} file {} for bytes {}-{}",
            self.source,
            file.index,
            start,
            end
        );
        let mut reader = self
            .handle
            .clone()
            .stream(file.index)
            .map_err(|e| Error::Io(e.to_string()))?;
        reader.seek(SeekFrom::Start(start)).await?;

        Ok(Box::pin(ReaderStream::with_capacity(
            reader.take(length),
            STREAM_BUFFER_SIZE,
        )))
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::Relaxed) {
            return;
        }

        match self
            .session
            .delete(TorrentIdOrHash::Id(self.handle.id()), false)
            .await
        {
            Ok(_) => debug!("Torrent {} has been removed from the session", self.source),
            Err(e) => warn!("Failed to remove torrent {} from the session, {}", self.source, e),
        }
    }
}
