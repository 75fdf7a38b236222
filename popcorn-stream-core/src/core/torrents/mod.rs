pub use default_engine::*;
pub use engine::*;
pub use errors::*;
pub use evictor::*;
pub use local::*;
pub use registry::*;
pub use rqbit::*;

mod default_engine;
mod engine;
mod errors;
mod evictor;
mod local;
mod registry;
mod rqbit;

#[cfg(any(test, feature = "testing"))]
pub mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use mockall::mock;

    mock! {
        #[derive(Debug)]
        pub Torrent {}

        #[async_trait]
        impl Torrent for Torrent {
            fn source(&self) -> &str;
            fn files(&self) -> Vec<TorrentFileInfo>;
            async fn open(
                &self,
                file: &TorrentFileInfo,
                range: Option<ByteRange>,
            ) -> Result<TorrentFileStream>;
            async fn destroy(&self);
        }
    }

    mock! {
        #[derive(Debug)]
        pub TorrentEngine {}

        #[async_trait]
        impl TorrentEngine for TorrentEngine {
            async fn add(&self, source: &str) -> Result<Box<dyn Torrent>>;
        }
    }

    /// Create a new file info for the given values.
    pub fn file_info(index: usize, filename: &str, length: u64) -> TorrentFileInfo {
        TorrentFileInfo {
            index,
            filename: filename.to_string(),
            length,
        }
    }

    /// Create a byte stream which returns the given data as a single chunk.
    pub fn bytes_stream(data: Vec<u8>) -> TorrentFileStream {
        Box::pin(futures::stream::iter(vec![Ok(Bytes::from(data))]))
    }
}
