use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{Config, Handle};

use crate::{Error, Result};

const LOG_FORMAT_CONSOLE: &str = "\x1B[37m{d(%Y-%m-%d %H:%M:%S%.3f)}\x1B[0m {h({l:>5.5})} \x1B[35m{I:>6.6}\x1B[0m \x1B[37m---\x1B[0m \x1B[37m[{T:>15.15}]\x1B[0m \x1B[36m{t:<50.50}\x1B[0m \x1B[37m:\x1B[0m {m}{n}";
const LOG_FORMAT_FILE: &str =
    "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:>5.5} {I:>6.6} --- [{T:>15.15}] {t:<50.50} : {m}{n}";
const CONSOLE_APPENDER: &str = "stdout";
const FILE_APPENDER: &str = "file";
const LOG_FILE_SIZE: u64 = 50 * 1024 * 1024;
const LOG_FILE_WINDOW: u32 = 5;
const LOG_FILE_STEM: &str = "popcorn-stream";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// The process wide logger of popcorn stream.
/// Only one logger can be initialized within the process.
#[derive(Debug)]
pub struct StreamLogger {
    handle: Handle,
}

impl StreamLogger {
    /// Returns a builder instance for the logger.
    pub fn builder() -> StreamLoggerBuilder {
        StreamLoggerBuilder::default()
    }

    /// Create a new logging instance.
    ///
    /// When a config path is given, the `log4.yml` configuration is used and the other arguments are ignored.
    pub fn new(
        root_level: LevelFilter,
        config_path: Option<impl AsRef<Path>>,
        log_path: Option<impl AsRef<Path>>,
        loggers: Vec<(String, LevelFilter)>,
    ) -> Result<Self> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        let result = match config_path {
            Some(path) => Self::load_from_config(path),
            None => Self::create_config(root_level, log_path, loggers),
        }
        .and_then(|config| {
            log4rs::init_config(config).map_err(|e| Error::InvalidConfig(e.to_string()))
        });

        match result {
            Ok(handle) => {
                info!("Popcorn stream logger has been initialized");
                Ok(Self { handle })
            }
            Err(e) => {
                INITIALIZED.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Returns the root logging level of the logger.
    pub fn root_log_level(&self) -> LevelFilter {
        self.handle.max_log_level()
    }

    /// Parse the given level name into a level filter, e.g. `debug`.
    pub fn parse_level(value: &str) -> Result<LevelFilter> {
        LevelFilter::from_str(value.trim()).map_err(|_| Error::InvalidLevel(value.to_string()))
    }

    fn load_from_config(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        log4rs::config::load_config_file(path, Default::default())
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn create_config(
        root_level: LevelFilter,
        log_path: Option<impl AsRef<Path>>,
        loggers: Vec<(String, LevelFilter)>,
    ) -> Result<Config> {
        let mut root = Root::builder().appender(CONSOLE_APPENDER);
        let mut config_builder = Config::builder().appender(Appender::builder().build(
            CONSOLE_APPENDER,
            Box::new(
                ConsoleAppender::builder()
                    .encoder(Box::new(PatternEncoder::new(LOG_FORMAT_CONSOLE)))
                    .build(),
            ),
        ));

        if let Some(path) = log_path {
            config_builder = config_builder.appender(Self::create_file_appender(path.as_ref())?);
            root = root.appender(FILE_APPENDER);
        }

        for (logger, level) in loggers.into_iter() {
            config_builder = config_builder.logger(Logger::builder().build(logger, level));
        }

        config_builder
            .build(root.build(root_level))
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn create_file_appender(path: &Path) -> Result<Appender> {
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        // rolled files are kept next to the active log file
        let roll_pattern = directory.join(format!("{}.{{}}.log", LOG_FILE_STEM));
        let roller = FixedWindowRoller::builder()
            .base(1)
            .build(roll_pattern.to_string_lossy().as_ref(), LOG_FILE_WINDOW)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let policy = CompoundPolicy::new(
            Box::new(SizeTrigger::new(LOG_FILE_SIZE)),
            Box::new(roller),
        );

        Ok(Appender::builder().build(
            FILE_APPENDER,
            Box::new(
                RollingFileAppender::builder()
                    .encoder(Box::new(PatternEncoder::new(LOG_FORMAT_FILE)))
                    .append(false)
                    .build(path, Box::new(policy))
                    .map_err(|e| Error::InvalidConfig(e.to_string()))?,
            ),
        ))
    }
}

/// The builder of the [StreamLogger].
#[derive(Debug, Default)]
pub struct StreamLoggerBuilder {
    root_level: Option<LevelFilter>,
    config_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    loggers: HashMap<String, LevelFilter>,
}

impl StreamLoggerBuilder {
    /// Set the root level of the logger.
    pub fn root_level(&mut self, level: LevelFilter) -> &mut Self {
        self.root_level = Some(level);
        self
    }

    /// Set the path of the `log4.yml` config to load.
    pub fn config_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the log file path of the logger.
    pub fn log_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add a log level filter for the given package.
    pub fn logger<S: AsRef<str>>(&mut self, package: S, level: LevelFilter) -> &mut Self {
        self.loggers.insert(package.as_ref().to_string(), level);
        self
    }

    /// Consumes the builder state and initializes the logger.
    pub fn build(&mut self) -> Result<StreamLogger> {
        let root_level = self.root_level.take().unwrap_or(LevelFilter::Info);
        let config_path = self.config_path.take();
        let log_path = self.log_path.take();
        let loggers = self.loggers.drain().collect::<Vec<_>>();

        StreamLogger::new(root_level, config_path, log_path, loggers)
    }
}
