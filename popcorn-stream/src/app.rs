use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use derive_more::Display;
use log::{debug, info, warn, LevelFilter};
use popcorn_stream_core::core::config::StreamProperties;
use popcorn_stream_core::core::sessions::{InMemorySessionStore, SessionListener};
use popcorn_stream_core::core::stream::StreamServer;
use popcorn_stream_core::core::torrents::{
    DefaultTorrentEngine, RqbitTorrentEngine, TorrentEngine, TorrentEvictor, TorrentRegistry,
};
use popcorn_stream_logging::StreamLogger;

use crate::api;
use crate::errors::{Error, Result};

/// The options of the [PopcornStream] application.
#[derive(Debug, Clone, Display, Parser)]
#[command(name = "popcorn-stream", version)]
#[display("config: {:?}, port: {:?}, log_level: {}", config, port, log_level)]
pub struct PopcornStreamArgs {
    /// The `application.yml` config file to use.
    /// When not given, the config file is looked up within the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// The port of the stream server, overrides the configured port.
    #[arg(long)]
    pub port: Option<u16>,
    /// The root log level of the application.
    #[arg(long, default_value = "info")]
    pub log_level: String,
    /// The file to which the logs are written next to the console.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// The `log4.yml` config to use for the logger.
    #[arg(long)]
    pub log_config: Option<PathBuf>,
    /// Disable the default `log4rs` logger of the application.
    #[arg(long, default_value_t = false)]
    pub disable_logger: bool,
}

/// The running popcorn stream application.
/// The background services of the application are stopped when it's dropped.
#[derive(Debug)]
pub struct PopcornStream {
    store: Arc<InMemorySessionStore>,
    registry: TorrentRegistry,
    server: StreamServer,
    _evictor: TorrentEvictor,
    _listener: SessionListener,
}

impl PopcornStream {
    /// Create and start a new application instance for the given arguments.
    pub async fn new(args: PopcornStreamArgs) -> Result<Self> {
        let properties = Self::load_properties(&args)?;
        if !args.disable_logger {
            Self::initialize_logger(&args, &properties)?;
        }

        info!("Creating new popcorn stream instance with {}", properties);
        Self::with_properties(properties).await
    }

    /// Create and start a new application instance for the given properties.
    /// Local sources are served from the filesystem, any other source is resolved through the torrent swarm.
    pub async fn with_properties(properties: StreamProperties) -> Result<Self> {
        let swarm = RqbitTorrentEngine::new(&properties.storage_path).await?;
        let engine = DefaultTorrentEngine::new(Arc::new(swarm));

        Self::with_engine(properties, Arc::new(engine)).await
    }

    /// Create and start a new application instance which resolves the torrent sources through the given engine.
    pub async fn with_engine(
        properties: StreamProperties,
        engine: Arc<dyn TorrentEngine>,
    ) -> Result<Self> {
        let host = IpAddr::from_str(properties.host.as_str())
            .map_err(|_| Error::InvalidHost(properties.host.clone()))?;
        let store = Arc::new(InMemorySessionStore::new());
        let registry = TorrentRegistry::builder()
            .engine(engine)
            .resolve_timeout(properties.resolve_timeout())
            .build();
        let evictor = TorrentEvictor::new(
            registry.clone(),
            properties.sweep_interval(),
            properties.idle_threshold(),
        );
        let listener = SessionListener::new(store.clone(), registry.clone());
        let server = StreamServer::builder()
            .registry(registry.clone())
            .store(store.clone())
            .host(host)
            .port(properties.port)
            .routes(api::routes(store.clone()))
            .build()
            .await?;

        evictor.start();
        Ok(Self {
            store,
            registry,
            server,
            _evictor: evictor,
            _listener: listener,
        })
    }

    /// Returns the session store of the application.
    pub fn store(&self) -> &Arc<InMemorySessionStore> {
        &self.store
    }

    /// Returns the torrent registry of the application.
    pub fn registry(&self) -> &TorrentRegistry {
        &self.registry
    }

    /// Returns the stream server of the application.
    pub fn server(&self) -> &StreamServer {
        &self.server
    }

    /// Stop the application services.
    pub fn stop(&self) {
        debug!("Stopping popcorn stream");
        self.server.stop();
    }

    fn load_properties(args: &PopcornStreamArgs) -> Result<StreamProperties> {
        let mut properties = match &args.config {
            Some(path) => StreamProperties::from_path(path)?,
            None => StreamProperties::new_auto(),
        };

        if let Some(port) = args.port {
            properties.port = port;
        }

        Ok(properties)
    }

    fn initialize_logger(args: &PopcornStreamArgs, properties: &StreamProperties) -> Result<()> {
        let mut builder = StreamLogger::builder();
        builder.root_level(StreamLogger::parse_level(args.log_level.as_str())?);

        if let Some(path) = &args.log_config {
            builder.config_path(path);
        }
        if let Some(path) = &args.log_file {
            builder.log_path(path);
        }

        let mut invalid_loggers = vec![];
        for (package, level) in properties.loggers.iter() {
            match StreamLogger::parse_level(level) {
                Ok(level) => {
                    builder.logger(package, level);
                }
                Err(e) => invalid_loggers.push((package.clone(), e)),
            }
        }
        // quiet down the http stack by default
        for package in ["hyper", "hyper_util", "mio"] {
            if !properties.loggers.contains_key(package) {
                builder.logger(package, LevelFilter::Info);
            }
        }

        builder.build()?;
        for (package, e) in invalid_loggers {
            warn!("Ignoring logger {}, {}", package, e);
        }
        Ok(())
    }
}

impl Drop for PopcornStream {
    fn drop(&mut self) {
        self.stop();
    }
}
