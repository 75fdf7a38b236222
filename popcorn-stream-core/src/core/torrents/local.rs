use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::fs;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::core::torrents::{
    ByteRange, Error, Result, Torrent, TorrentEngine, TorrentFileInfo, TorrentFileStream,
};

const FILE_SCHEME: &str = "file";
const STREAM_BUFFER_SIZE: usize = 256 * 1000;

/// The torrent engine which resolves local filesystem sources.
///
/// A source is either a `file://` uri or a plain path pointing to a single file or a directory.
/// The files of a directory are used in the order of their path, sub-directories are ignored.
#[derive(Debug, Default)]
pub struct LocalTorrentEngine;

impl LocalTorrentEngine {
    pub fn new() -> Self {
        Self
    }

    /// Check if the given source points to the local filesystem.
    pub fn supports(source: &str) -> bool {
        match Url::parse(source) {
            Ok(url) => url.scheme() == FILE_SCHEME || url.scheme().len() == 1,
            Err(_) => true,
        }
    }

    fn source_path(source: &str) -> Result<PathBuf> {
        match Url::parse(source) {
            Ok(url) if url.scheme() == FILE_SCHEME => url.to_file_path().map_err(|_| {
                Error::ResolutionFailed(source.to_string(), "invalid file uri".to_string())
            }),
            // a single letter scheme is a windows drive letter
            Ok(url) if url.scheme().len() == 1 => Ok(PathBuf::from(source)),
            Ok(url) => Err(Error::ResolutionFailed(
                source.to_string(),
                format!("unsupported scheme {}", url.scheme()),
            )),
            Err(_) => Ok(PathBuf::from(source)),
        }
    }

    async fn collect_files(source: &str, path: &Path) -> Result<Vec<LocalFile>> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| Error::ResolutionFailed(source.to_string(), e.to_string()))?;

        let mut paths = Vec::new();
        if metadata.is_dir() {
            let mut entries = fs::read_dir(path)
                .await
                .map_err(|e| Error::ResolutionFailed(source.to_string(), e.to_string()))?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_file() {
                    paths.push((entry.path(), metadata.len()));
                }
            }
            paths.sort_by(|(a, _), (b, _)| a.cmp(b));
        } else {
            paths.push((path.to_path_buf(), metadata.len()));
        }

        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(index, (path, length))| LocalFile {
                info: TorrentFileInfo {
                    index,
                    filename: path
                        .file_name()
                        .map(|e| e.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    length,
                },
                path,
            })
            .collect())
    }
}

#[async_trait]
impl TorrentEngine for LocalTorrentEngine {
    async fn add(&self, source: &str) -> Result<Box<dyn Torrent>> {
        trace!("Resolving local torrent source {}", source);
        let path = Self::source_path(source)?;
        let files = Self::collect_files(source, &path).await?;
        debug!(
            "Resolved local torrent {} with {} file(s)",
            source,
            files.len()
        );

        Ok(Box::new(LocalTorrent {
            source: source.to_string(),
            files,
            destroyed: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug)]
struct LocalFile {
    info: TorrentFileInfo,
    path: PathBuf,
}

/// A torrent backed by files on the local filesystem.
#[derive(Debug)]
pub struct LocalTorrent {
    source: String,
    files: Vec<LocalFile>,
    destroyed: AtomicBool,
}

#[async_trait]
impl Torrent for LocalTorrent {
    fn source(&self) -> &str {
        self.source.as_str()
    }

    fn files(&self) -> Vec<TorrentFileInfo> {
        self.files.iter().map(|e| e.info.clone()).collect()
    }

    async fn open(
        &self,
        file: &TorrentFileInfo,
        range: Option<ByteRange>,
    ) -> Result<TorrentFileStream> {
        if self.destroyed.load(Ordering::Relaxed) {
            return Err(Error::Destroyed(self.source.clone()));
        }

        let local_file = self
            .files
            .get(file.index)
            .ok_or(Error::FileNotFound(file.index))?;
        let file_length = local_file.info.length;
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
            "Opening local file {} for bytes {}-{}",
            local_file.path.display(),
            start,
            end
        );
        let mut reader = File::open(&local_file.path).await.map_err(|e| {
            warn!("Failed to open local file {}, {}", local_file.path.display(), e);
            Error::from(e)
        })?;
        reader.seek(SeekFrom::Start(start)).await?;

        Ok(Box::pin(ReaderStream::with_capacity(
            reader.take(length),
            STREAM_BUFFER_SIZE,
        )))
    }

    async fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::Relaxed) {
            debug!("Local torrent {} has been destroyed", self.source);
        }
    }
}
