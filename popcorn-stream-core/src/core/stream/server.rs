use std::cmp::Reverse;
use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use axum::http::{HeaderMap, Method, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{http, Router};
use futures::TryStreamExt;
use log::{debug, error, info, trace, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::core::sessions::SessionStore;
use crate::core::stream::{
    content_disposition, Error, MediaType, MediaTypeFactory, Range, Result,
};
use crate::core::torrents::{Torrent, TorrentFileInfo, TorrentRegistry};
use crate::core::utils::network::advertised_addr;

const SERVER_PROTOCOL: &str = "http";
const SERVER_STREAM_PATH: &str = "stream";
const ACCEPT_RANGES_TYPE: &str = "bytes";
const HEADER_DLNA_TRANSFER_MODE: &str = "transferMode.dlna.org";
const HEADER_DLNA_CONTENT_FEATURES: &str = "contentFeatures.dlna.org";
const DLNA_TRANSFER_MODE_TYPE: &str = "Streaming";
const DLNA_CONTENT_FEATURES: &str =
    "DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000";

/// The server which streams the largest file of a session's torrent over HTTP.
///
/// Streams are requested through `/stream/{session id}` and support byte range requests.
/// The server is shut down when the last instance is dropped.
#[derive(Debug, Clone)]
pub struct StreamServer {
    inner: Arc<InnerStreamServer>,
}

impl StreamServer {
    /// Returns a builder instance for the stream server.
    pub fn builder() -> StreamServerBuilder {
        StreamServerBuilder::default()
    }

    /// Returns the address on which the server can be reached.
    pub fn addr(&self) -> &SocketAddr {
        &self.inner.addr
    }

    /// Returns the url on which the stream of the given session can be reached.
    pub fn url(&self, session_id: &str) -> Result<Url> {
        self.inner
            .build_url(session_id)
            .map_err(|e| Error::Parse(e.to_string()))
    }

    /// Stop the server.
    pub fn stop(&self) {
        self.inner.cancellation_token.cancel();
    }

    /// Wait for the server to be stopped.
    pub async fn stopped(&self) {
        self.inner.cancellation_token.cancelled().await
    }

    async fn do_stream(
        State(state): State<Arc<InnerStreamServer>>,
        Path(session_id): Path<String>,
        method: Method,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        state
            .handle_stream_request(session_id.as_str(), &headers, method == Method::HEAD)
            .await
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            self.inner.cancellation_token.cancel();
        }
    }
}

/// The builder of the [StreamServer].
#[derive(Debug, Default)]
pub struct StreamServerBuilder {
    registry: Option<TorrentRegistry>,
    store: Option<Arc<dyn SessionStore>>,
    host: Option<IpAddr>,
    port: Option<u16>,
    routes: Option<Router>,
}

impl StreamServerBuilder {
    /// Set the registry from which the torrents are looked up.
    pub fn registry(mut self, registry: TorrentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the session store which resolves session identifiers into torrent sources.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the address on which the server listens, defaults to all interfaces.
    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the port of the server, defaults to a port assigned by the OS.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Add additional routes which should be served next to the stream routes.
    pub fn routes(mut self, routes: Router) -> Self {
        self.routes = Some(match self.routes.take() {
            None => routes,
            Some(existing) => existing.merge(routes),
        });
        self
    }

    /// Bind the server and start serving requests in the background.
    ///
    /// # Panics
    ///
    /// Panics if the registry or session store is not set.
    pub async fn build(self) -> Result<StreamServer> {
        let registry = self.registry.expect("expected a registry to have been set");
        let store = self.store.expect("expected a session store to have been set");
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let listener = TcpListener::bind((host, self.port.unwrap_or(0))).await?;
        let addr = SocketAddr::new(advertised_addr(host), listener.local_addr()?.port());
        let inner = Arc::new(InnerStreamServer {
            addr,
            registry,
            store,
            media_type_factory: Default::default(),
            cancellation_token: Default::default(),
        });

        let mut router = Router::new()
            .route(
                "/stream/{session_id}",
                get(StreamServer::do_stream).head(StreamServer::do_stream),
            )
            .with_state(inner.clone());
        if let Some(routes) = self.routes {
            router = router.merge(routes);
        }

        let cancellation_token = inner.cancellation_token.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(cancellation_token.clone().cancelled_owned())
                .await
            {
                error!("Failed to start stream server, {}", e);
            }
            cancellation_token.cancel();
            debug!("Stream server has been stopped");
        });

        info!("Stream server is running on {}", addr);
        Ok(StreamServer { inner })
    }
}

#[derive(Debug)]
struct InnerStreamServer {
    addr: SocketAddr,
    registry: TorrentRegistry,
    store: Arc<dyn SessionStore>,
    media_type_factory: MediaTypeFactory,
    cancellation_token: CancellationToken,
}

impl InnerStreamServer {
    async fn handle_stream_request(
        &self,
        session_id: &str,
        headers: &HeaderMap,
        headers_only: bool,
    ) -> Response<Body> {
        trace!("Handling stream request for session {}", session_id);
        let (torrent, file) = match self.resolve_file(session_id).await {
            Ok(e) => e,
            Err(e) => {
                warn!("Unable to serve stream of session {}, {}", session_id, e);
                return Self::not_found_response();
            }
        };

        let range = Self::extract_range(headers, file.length);
        let media_type = self
            .media_type_factory
            .media_type(file.filename.as_str())
            .unwrap_or_else(|e| {
                debug!("Unable to determine media type, {}", e);
                MediaType::octet_stream()
            });
        let mut response = Response::builder()
            .header(ACCEPT_RANGES, ACCEPT_RANGES_TYPE)
            .header(CONTENT_TYPE, media_type.to_string())
            .header(CONTENT_DISPOSITION, content_disposition(file.filename.as_str()))
            .header(HEADER_DLNA_TRANSFER_MODE, DLNA_TRANSFER_MODE_TYPE)
            .header(HEADER_DLNA_CONTENT_FEATURES, DLNA_CONTENT_FEATURES);
        response = match &range {
            None => response
                .status(StatusCode::OK)
                .header(CONTENT_LENGTH, file.length),
            Some(range) => response
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_RANGE, range.content_range(file.length))
                .header(CONTENT_LENGTH, range.len()),
        };

        if headers_only {
            return response
                .body(Body::empty())
                .unwrap_or_else(Self::handle_internal_error);
        }

        let stream = match torrent
            .open(&file, range.as_ref().map(|e| e.start..=e.end))
            .await
        {
            Ok(e) => e,
            Err(e) => {
                error!("Failed to open stream of session {}, {}", session_id, e);
                return Self::not_found_response();
            }
        };

        debug!(
            "Streaming {} for session {} with range {}",
            file,
            session_id,
            range
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "full".to_string())
        );
        let session_id = session_id.to_string();
        response
            .body(Body::from_stream(stream.inspect_err(move |e| {
                error!("Stream of session {} failed, {}", session_id, e)
            })))
            .unwrap_or_else(Self::handle_internal_error)
    }

    /// Resolve the torrent and file to serve for the given session.
    /// The lookup of the torrent refreshes its access time within the registry.
    async fn resolve_file(&self, session_id: &str) -> Result<(Arc<dyn Torrent>, TorrentFileInfo)> {
        let session = self.store.get(session_id).await?;
        let torrent = self.registry.lookup(session.source.as_str()).await?;
        let file = Self::select_file(torrent.files())
            .ok_or_else(|| Error::NoFile(session.source.clone()))?;

        Ok((torrent, file))
    }

    /// Select the largest file, the first file in order wins when multiple files have the same length.
    fn select_file(files: Vec<TorrentFileInfo>) -> Option<TorrentFileInfo> {
        files.into_iter().min_by_key(|e| Reverse(e.length))
    }

    /// Try to extract the first satisfiable range from the given headers.
    /// If the header is not present or invalid, `None` will be returned.
    fn extract_range(headers: &HeaderMap, size: u64) -> Option<Range> {
        let value = headers.get(RANGE)?;
        let result = value
            .to_str()
            .map_err(|e| Error::Parse(e.to_string()))
            .and_then(|e| Range::parse(e, size));

        match result {
            Ok(ranges) => ranges.into_iter().next(),
            Err(e) => {
                warn!("Range header {:?} is invalid, {}", value, e);
                None
            }
        }
    }

    fn build_url(&self, session_id: &str) -> std::result::Result<Url, url::ParseError> {
        let host = format!("{}://{}", SERVER_PROTOCOL, self.addr);
        let mut url = Url::parse(host.as_str())?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().push(SERVER_STREAM_PATH).push(session_id);
        }
        Ok(url)
    }

    fn not_found_response() -> Response<Body> {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap_or_else(Self::handle_internal_error)
    }

    /// Handle an internal error that occurred while handling a request.
    /// This will return a 500 status code with an empty body.
    fn handle_internal_error(err: http::Error) -> Response<Body> {
        error!("Stream server request failed, {}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, Body::empty()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sessions::InMemorySessionStore;
    use crate::core::torrents::tests::{bytes_stream, file_info, MockTorrent, MockTorrentEngine};
    use crate::core::torrents::{LocalTorrentEngine, TorrentFileStream};
    use crate::init_logger;
    use bytes::Bytes;
    use futures::StreamExt;
    use reqwest::Client;
    use std::io;
    use std::io::Write;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    const FILE_LENGTH: usize = 1000;

    struct TestServer {
        server: StreamServer,
        registry: TorrentRegistry,
        store: Arc<InMemorySessionStore>,
        #[allow(dead_code)]
        temp_dir: TempDir,
    }

    fn test_data() -> Vec<u8> {
        (0..FILE_LENGTH).map(|e| (e % 256) as u8).collect()
    }

    async fn new_server(registry: TorrentRegistry, store: Arc<InMemorySessionStore>) -> StreamServer {
        StreamServer::builder()
            .registry(registry)
            .store(store)
            .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .build()
            .await
            .expect("expected the server to have been started")
    }

    /// Start a server which serves a local directory containing the given files.
    async fn new_local_server(files: Vec<(&str, Vec<u8>)>) -> (TestServer, String) {
        let temp_dir = tempfile::tempdir().unwrap();
        for (filename, data) in files {
            let mut file = std::fs::File::create(temp_dir.path().join(filename)).unwrap();
            file.write_all(&data).unwrap();
        }
        let source = temp_dir.path().to_str().unwrap().to_string();
        let registry = TorrentRegistry::builder()
            .engine(Arc::new(LocalTorrentEngine::new()))
            .build();
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(source.clone()).await;
        registry.ensure_session(source.as_str()).await.unwrap();
        let server = new_server(registry.clone(), store.clone()).await;

        (
            TestServer {
                server,
                registry,
                store,
                temp_dir,
            },
            session.id,
        )
    }

    #[tokio::test]
    async fn test_stop() {
        init_logger!();
        let registry = TorrentRegistry::builder()
            .engine(Arc::new(MockTorrentEngine::new()))
            .build();
        let server = new_server(registry, Arc::new(InMemorySessionStore::new())).await;
        let url = server.url("lorem").unwrap();

        server.stop();
        tokio::time::timeout(std::time::Duration::from_millis(500), server.stopped())
            .await
            .expect("expected the server to have been stopped");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let result = Client::new().get(url).send().await;
        assert!(result.is_err(), "expected the server to no longer accept requests");
    }

    #[tokio::test]
    async fn test_url() {
        init_logger!();
        let registry = TorrentRegistry::builder()
            .engine(Arc::new(MockTorrentEngine::new()))
            .build();
        let server = new_server(registry, Arc::new(InMemorySessionStore::new())).await;

        let result = server.url("1a2b3c").unwrap();

        assert_eq!(
            format!("http://127.0.0.1:{}/stream/1a2b3c", server.addr().port()),
            result.to_string()
        );
    }

    mod get {
        use super::*;

        #[tokio::test]
        async fn test_stream_full_file() {
            init_logger!();
            let data = test_data();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", data.clone())]).await;
            let client = Client::new();

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .send()
                .await
                .expect("expected a valid response");

            assert_eq!(reqwest::StatusCode::OK, response.status());
            let headers = response.headers().clone();
            assert_eq!("1000", headers.get("content-length").unwrap().to_str().unwrap());
            assert_eq!("bytes", headers.get("accept-ranges").unwrap().to_str().unwrap());
            assert_eq!("video/mp4", headers.get("content-type").unwrap().to_str().unwrap());
            assert_eq!(
                "inline; filename*=UTF-8''Movie.mp4",
                headers.get("content-disposition").unwrap().to_str().unwrap()
            );
            assert_eq!(
                DLNA_TRANSFER_MODE_TYPE,
                headers.get("transfermode.dlna.org").unwrap().to_str().unwrap()
            );
            assert_eq!(
                DLNA_CONTENT_FEATURES,
                headers.get("contentfeatures.dlna.org").unwrap().to_str().unwrap()
            );
            assert_eq!(data, response.bytes().await.unwrap().to_vec());
        }

        #[tokio::test]
        async fn test_stream_range() {
            init_logger!();
            let data = test_data();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", data.clone())]).await;
            let client = Client::new();

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .header("Range", "bytes=0-99")
                .send()
                .await
                .expect("expected a valid response");

            assert_eq!(reqwest::StatusCode::PARTIAL_CONTENT, response.status());
            let headers = response.headers().clone();
            assert_eq!(
                "bytes 0-99/1000",
                headers.get("content-range").unwrap().to_str().unwrap()
            );
            assert_eq!("100", headers.get("content-length").unwrap().to_str().unwrap());
            assert_eq!(data[0..100].to_vec(), response.bytes().await.unwrap().to_vec());
        }

        #[tokio::test]
        async fn test_stream_only_first_range() {
            init_logger!();
            let data = test_data();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", data.clone())]).await;
            let client = Client::new();

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .header("Range", "bytes=500-599,700-799")
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::PARTIAL_CONTENT, response.status());
            assert_eq!(
                "bytes 500-599/1000",
                response.headers().get("content-range").unwrap().to_str().unwrap()
            );
            assert_eq!(data[500..600].to_vec(), response.bytes().await.unwrap().to_vec());
        }

        #[tokio::test]
        async fn test_stream_invalid_range() {
            init_logger!();
            let data = test_data();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", data.clone())]).await;
            let client = Client::new();

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .header("Range", "bytes=2000-3000")
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::OK, response.status());
            assert_eq!(None, response.headers().get("content-range"));
            assert_eq!(data, response.bytes().await.unwrap().to_vec());
        }

        #[tokio::test]
        async fn test_stream_largest_file() {
            init_logger!();
            let (test, session_id) = new_local_server(vec![
                ("a-sample.mkv", vec![1u8; 100]),
                ("b-movie.mkv", vec![2u8; 300]),
                ("c-movie.mkv", vec![3u8; 300]),
                ("d-subtitle.srt", vec![4u8; 10]),
            ])
            .await;
            let client = Client::new();

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::OK, response.status());
            assert_eq!(
                "inline; filename*=UTF-8''b-movie.mkv",
                response
                    .headers()
                    .get("content-disposition")
                    .unwrap()
                    .to_str()
                    .unwrap()
            );
            assert_eq!(vec![2u8; 300], response.bytes().await.unwrap().to_vec());
        }

        #[tokio::test]
        async fn test_stream_encoded_filename() {
            init_logger!();
            let (test, session_id) =
                new_local_server(vec![("My Movie (2020)*.mp4", test_data())]).await;
            let client = Client::new();

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(
                "inline; filename*=UTF-8''My%20Movie%20%282020%29%2A.mp4",
                response
                    .headers()
                    .get("content-disposition")
                    .unwrap()
                    .to_str()
                    .unwrap()
            );
        }

        #[tokio::test]
        async fn test_stream_unknown_session() {
            init_logger!();
            let registry = TorrentRegistry::builder()
                .engine(Arc::new(MockTorrentEngine::new()))
                .build();
            let server = new_server(registry.clone(), Arc::new(InMemorySessionStore::new())).await;
            let client = Client::new();

            let response = client
                .get(server.url("does-not-exist").unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::NOT_FOUND, response.status());
            assert_eq!(0, response.bytes().await.unwrap().len());
            assert!(registry.is_empty().await, "expected the registry to be untouched");
        }

        #[tokio::test]
        async fn test_stream_evicted_torrent() {
            init_logger!();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", test_data())]).await;
            let client = Client::new();
            test.registry
                .sweep_idle(
                    chrono::Utc::now() + chrono::Duration::days(1),
                    std::time::Duration::from_secs(3600),
                )
                .await;

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::NOT_FOUND, response.status());
            assert_eq!(1, test.store.len().await);
        }

        #[tokio::test]
        async fn test_stream_refreshes_access_time() {
            init_logger!();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", test_data())]).await;
            let source = test.store.get(session_id.as_str()).await.unwrap().source;
            let before = test.registry.last_accessed(source.as_str()).await.unwrap();
            let client = Client::new();
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;

            let response = client
                .get(test.server.url(session_id.as_str()).unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::OK, response.status());
            let result = test.registry.last_accessed(source.as_str()).await.unwrap();
            assert!(result > before, "expected the access time to have been refreshed");
        }

        #[tokio::test]
        async fn test_stream_open_failure() {
            init_logger!();
            let store = Arc::new(InMemorySessionStore::new());
            let session = store.create("magnet:?xt=urn:btih:Foo").await;
            let mut engine = MockTorrentEngine::new();
            engine.expect_add().returning(|source| {
                let mut torrent = MockTorrent::new();
                torrent.expect_source().return_const(source.to_string());
                torrent
                    .expect_files()
                    .returning(|| vec![file_info(0, "Foo.mp4", 100)]);
                torrent
                    .expect_open()
                    .returning(|_, _| Err(crate::core::torrents::Error::Destroyed("Foo".to_string())));
                Ok(Box::new(torrent) as Box<dyn Torrent>)
            });
            let registry = TorrentRegistry::builder().engine(Arc::new(engine)).build();
            registry.ensure_session(session.source.as_str()).await.unwrap();
            let server = new_server(registry, store).await;

            let response = Client::new()
                .get(server.url(session.id.as_str()).unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::NOT_FOUND, response.status());
        }

        #[tokio::test]
        async fn test_stream_io_error() {
            init_logger!();
            let store = Arc::new(InMemorySessionStore::new());
            let session = store.create("magnet:?xt=urn:btih:Bar").await;
            let mut engine = MockTorrentEngine::new();
            engine.expect_add().returning(|source| {
                let mut torrent = MockTorrent::new();
                torrent.expect_source().return_const(source.to_string());
                torrent
                    .expect_files()
                    .returning(|| vec![file_info(0, "Bar.mp4", 100)]);
                torrent.expect_open().returning(|_, _| {
                    Ok(Box::pin(futures::stream::iter(vec![
                        Ok(Bytes::from(vec![0u8; 10])),
                        Err(io::Error::other("disk gone")),
                    ])) as TorrentFileStream)
                });
                Ok(Box::new(torrent) as Box<dyn Torrent>)
            });
            let registry = TorrentRegistry::builder().engine(Arc::new(engine)).build();
            registry.ensure_session(session.source.as_str()).await.unwrap();
            let server = new_server(registry.clone(), store).await;

            let response = Client::new()
                .get(server.url(session.id.as_str()).unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::OK, response.status());
            let result = response.bytes().await;
            assert!(result.is_err(), "expected the response body to have been aborted");
            assert!(
                registry.contains(session.source.as_str()).await,
                "expected the torrent to remain active"
            );
        }

        #[tokio::test]
        async fn test_stream_client_disconnected() {
            init_logger!();
            let store = Arc::new(InMemorySessionStore::new());
            let session = store.create("magnet:?xt=urn:btih:Baz").await;
            let (tx, rx) = oneshot::channel();
            let mut engine = MockTorrentEngine::new();
            engine.expect_add().times(1).return_once(move |source| {
                let mut torrent = MockTorrent::new();
                torrent.expect_source().return_const(source.to_string());
                torrent
                    .expect_files()
                    .returning(|| vec![file_info(0, "Baz.mp4", 1 << 40)]);
                torrent.expect_open().times(1).return_once(move |_, _| {
                    let guard = DropNotifier(Some(tx));
                    let stream = futures::stream::repeat_with(|| {
                        Ok::<_, io::Error>(Bytes::from(vec![0u8; 64 * 1024]))
                    })
                    .map(move |chunk| {
                        let _ = &guard;
                        chunk
                    });
                    Ok(Box::pin(stream) as TorrentFileStream)
                });
                Ok(Box::new(torrent) as Box<dyn Torrent>)
            });
            let registry = TorrentRegistry::builder().engine(Arc::new(engine)).build();
            registry.ensure_session(session.source.as_str()).await.unwrap();
            let server = new_server(registry.clone(), store).await;

            let mut response = Client::new()
                .get(server.url(session.id.as_str()).unwrap())
                .send()
                .await
                .unwrap();
            let chunk = response.chunk().await.unwrap();
            assert!(chunk.is_some(), "expected to receive a chunk of the stream");
            drop(response);

            tokio::time::timeout(std::time::Duration::from_secs(2), rx)
                .await
                .expect("expected the stream to have been dropped")
                .expect("expected the drop to have been notified");
            assert!(
                registry.contains(session.source.as_str()).await,
                "expected the torrent to remain active"
            );
        }

        struct DropNotifier(Option<oneshot::Sender<()>>);

        impl Drop for DropNotifier {
            fn drop(&mut self) {
                if let Some(sender) = self.0.take() {
                    let _ = sender.send(());
                }
            }
        }
    }

    mod head {
        use super::*;

        #[tokio::test]
        async fn test_head_never_opens_stream() {
            init_logger!();
            let store = Arc::new(InMemorySessionStore::new());
            let session = store.create("magnet:?xt=urn:btih:Bar").await;
            let mut engine = MockTorrentEngine::new();
            engine.expect_add().returning(|source| {
                let mut torrent = MockTorrent::new();
                torrent.expect_source().return_const(source.to_string());
                torrent
                    .expect_files()
                    .returning(|| vec![file_info(0, "Bar.mkv", 1000)]);
                torrent.expect_open().never();
                Ok(Box::new(torrent) as Box<dyn Torrent>)
            });
            let registry = TorrentRegistry::builder().engine(Arc::new(engine)).build();
            registry.ensure_session(session.source.as_str()).await.unwrap();
            let server = new_server(registry, store).await;

            let response = Client::new()
                .head(server.url(session.id.as_str()).unwrap())
                .header("Range", "bytes=0-99")
                .send()
                .await
                .expect("expected a valid response");

            assert_eq!(reqwest::StatusCode::PARTIAL_CONTENT, response.status());
            let headers = response.headers().clone();
            assert_eq!("100", headers.get("content-length").unwrap().to_str().unwrap());
            assert_eq!(
                "bytes 0-99/1000",
                headers.get("content-range").unwrap().to_str().unwrap()
            );
            assert_eq!(
                "video/x-matroska",
                headers.get("content-type").unwrap().to_str().unwrap()
            );
            assert_eq!(0, response.bytes().await.unwrap().len());
        }

        #[tokio::test]
        async fn test_head_same_headers_as_get() {
            init_logger!();
            let (test, session_id) = new_local_server(vec![("Movie.mp4", test_data())]).await;
            let client = Client::new();
            let url = test.server.url(session_id.as_str()).unwrap();

            let head = client.head(url.clone()).send().await.unwrap();
            let get = client.get(url).send().await.unwrap();

            assert_eq!(get.status(), head.status());
            for header in [
                "content-length",
                "content-type",
                "content-disposition",
                "accept-ranges",
                "transfermode.dlna.org",
                "contentfeatures.dlna.org",
            ] {
                assert_eq!(
                    get.headers().get(header),
                    head.headers().get(header),
                    "expected header {} to match",
                    header
                );
            }
            assert_eq!(0, head.bytes().await.unwrap().len());
        }

        #[tokio::test]
        async fn test_head_unknown_session() {
            init_logger!();
            let registry = TorrentRegistry::builder()
                .engine(Arc::new(MockTorrentEngine::new()))
                .build();
            let server = new_server(registry, Arc::new(InMemorySessionStore::new())).await;

            let response = Client::new()
                .head(server.url("lorem").unwrap())
                .send()
                .await
                .unwrap();

            assert_eq!(reqwest::StatusCode::NOT_FOUND, response.status());
        }
    }

    #[test]
    fn test_select_file_ties() {
        let files = vec![
            file_info(0, "a.mp4", 10),
            file_info(1, "b.mp4", 20),
            file_info(2, "c.mp4", 20),
        ];

        let result = InnerStreamServer::select_file(files);

        assert_eq!(Some(file_info(1, "b.mp4", 20)), result);
    }

    #[test]
    fn test_select_file_empty() {
        assert_eq!(None, InnerStreamServer::select_file(vec![]));
    }

    #[tokio::test]
    async fn test_stream_mock_torrent() {
        init_logger!();
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create("magnet:?xt=urn:btih:Lorem").await;
        let mut engine = MockTorrentEngine::new();
        engine.expect_add().returning(|source| {
            let mut torrent = MockTorrent::new();
            torrent.expect_source().return_const(source.to_string());
            torrent
                .expect_files()
                .returning(|| vec![file_info(0, "lorem.txt", 11)]);
            torrent
                .expect_open()
                .withf(|_, range| range.is_none())
                .returning(|_, _| Ok(bytes_stream(b"lorem ipsum".to_vec())));
            Ok(Box::new(torrent) as Box<dyn Torrent>)
        });
        let registry = TorrentRegistry::builder().engine(Arc::new(engine)).build();
        registry.ensure_session(session.source.as_str()).await.unwrap();
        let server = new_server(registry, store).await;

        let response = Client::new()
            .get(server.url(session.id.as_str()).unwrap())
            .send()
            .await
            .unwrap();

        assert_eq!(reqwest::StatusCode::OK, response.status());
        assert_eq!("lorem ipsum", response.text().await.unwrap());
    }
}
