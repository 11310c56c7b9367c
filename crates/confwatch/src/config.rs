//! Client configuration.
//!
//! [`ClientConfig`] is passed explicitly to [`WatchClient::new`](crate::WatchClient::new);
//! there is no process-wide registration state. It can be built in code,
//! read from the environment, layered over a `.env` file, or parsed from CLI
//! flags (with the `clap` feature).
//!
//! # Environment Variables
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `APP_ID` | application id (remote group) | required |
//! | `CONFWATCH_SERVERS` | comma-separated server URLs | required |
//! | `CONFWATCH_NAMESPACE` | remote namespace | required |
//! | `CONFWATCH_LOG_DIR` | backend log directory | required |
//! | `CONFWATCH_CACHE_DIR` | backend cache directory | required |
//! | `CONFWATCH_LOG_LEVEL` | backend log level | `info` |
//! | `CONFWATCH_TIMEOUT_MS` | remote call timeout | `5000` |
//! | `CONFWATCH_NO_CACHE` | skip the backend cache at start | `false` |
//! | `CONFWATCH_EVENT_BUFFER` | capacity of each event outlet | `10` |
//!
//! # Example
//!
//! ```rust
//! use confwatch::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::default()
//!     .with_app_id("billing")
//!     .with_namespace("prod")
//!     .with_servers("http://10.0.0.1:8848,http://10.0.0.2:8848")
//!     .unwrap()
//!     .with_log_dir("/var/log/confwatch")
//!     .with_cache_dir("/var/cache/confwatch")
//!     .with_timeout(Duration::from_secs(3));
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.servers().len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::value::Value;

/// Default capacity of each event outlet.
pub const DEFAULT_EVENT_BUFFER: usize = 10;

/// Default timeout for remote calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Port used when a server URL has neither an explicit port nor a scheme default.
pub const DEFAULT_SERVER_PORT: u16 = 8848;

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod vars {
    /// Application id.
    pub const APP_ID: &str = "APP_ID";
    /// Comma-separated server URLs.
    pub const SERVERS: &str = "CONFWATCH_SERVERS";
    /// Remote namespace.
    pub const NAMESPACE: &str = "CONFWATCH_NAMESPACE";
    /// Backend log directory.
    pub const LOG_DIR: &str = "CONFWATCH_LOG_DIR";
    /// Backend cache directory.
    pub const CACHE_DIR: &str = "CONFWATCH_CACHE_DIR";
    /// Backend log level.
    pub const LOG_LEVEL: &str = "CONFWATCH_LOG_LEVEL";
    /// Remote call timeout in milliseconds.
    pub const TIMEOUT_MS: &str = "CONFWATCH_TIMEOUT_MS";
    /// Skip loading the backend cache at start.
    pub const NO_CACHE: &str = "CONFWATCH_NO_CACHE";
    /// Outlet capacity.
    pub const EVENT_BUFFER: &str = "CONFWATCH_EVENT_BUFFER";
}

/// Log level handed to the remote backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Verbose backend logging.
    Debug,
    /// Normal backend logging.
    #[default]
    Info,
    /// Warnings and errors only.
    Warn,
    /// Errors only.
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),

            "info" => Ok(Self::Info),

            "warn" | "warning" => Ok(Self::Warn),

            "error" => Ok(Self::Error),

            _ => Err(ConfigError::invalid_value(
                "log level",
                s,
                "expected one of: debug, info, warn, error",
            )),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// One remote config server endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    /// URL scheme, e.g. `http`.
    pub scheme: String,
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Path prefix on the server (empty or starting with `/`).
    pub context_path: String,
}

impl ServerAddr {
    /// Parse a single server URL.
    ///
    /// A missing scheme defaults to `http`. The port is the explicit one,
    /// else the scheme's well-known port, else [`DEFAULT_SERVER_PORT`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServer`] if the entry is not a URL with a host.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let url =
            Url::parse(&candidate).map_err(|e| ConfigError::invalid_server(trimmed, e.to_string()))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::invalid_server(trimmed, "missing host"))?;

        let context_path = match url.path() {
            "/" => String::new(),
            path => path.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port_or_known_default().unwrap_or(DEFAULT_SERVER_PORT),
            context_path,
        })
    }
}

impl Display for ServerAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme, self.host, self.port, self.context_path
        )
    }
}

/// Parse a comma-separated server list, skipping blank entries.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidServer`] for the first malformed entry, or
/// [`ConfigError::Missing`] if the list has no entries at all.
pub fn parse_servers(list: &str) -> Result<Vec<ServerAddr>, ConfigError> {
    let servers = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(ServerAddr::parse)
        .collect::<Result<Vec<_>, _>>()?;

    if servers.is_empty() {
        return Err(ConfigError::missing("servers", vars::SERVERS));
    }

    Ok(servers)
}

/// Settings for a [`WatchClient`](crate::WatchClient) and its remote backend.
///
/// The connection settings (servers, namespace, directories, log level) are
/// carried for the backend; the client itself uses the application id as the
/// remote group, the event buffer as outlet capacity, and the timeout to flag
/// slow remote calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    app_id: String,
    namespace: String,
    servers: Vec<ServerAddr>,
    log_dir: PathBuf,
    cache_dir: PathBuf,
    log_level: LogLevel,
    timeout: Duration,
    load_cache_at_start: bool,
    event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            namespace: String::new(),
            servers: Vec::new(),
            log_dir: PathBuf::new(),
            cache_dir: PathBuf::new(),
            log_level: LogLevel::default(),
            timeout: DEFAULT_TIMEOUT,
            load_cache_at_start: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ClientConfig {
    /// Set the application id (used as the remote group).
    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Set the remote namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Parse and set the server list.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is malformed or the list is empty.
    pub fn with_servers(mut self, list: &str) -> Result<Self, ConfigError> {
        self.servers = parse_servers(list)?;
        Ok(self)
    }

    /// Add one already-parsed server.
    #[must_use]
    pub fn with_server(mut self, server: ServerAddr) -> Self {
        self.servers.push(server);
        self
    }

    /// Set the backend log directory.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the backend cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the backend log level.
    #[must_use]
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set the remote call timeout (default: 5s).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the backend should load its on-disk cache at start (default: true).
    #[must_use]
    pub const fn with_load_cache_at_start(mut self, load: bool) -> Self {
        self.load_cache_at_start = load;
        self
    }

    /// Set the capacity of each event outlet (default: 10).
    #[must_use]
    pub const fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Application id, used as the remote group.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Remote namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Remote servers.
    #[must_use]
    pub fn servers(&self) -> &[ServerAddr] {
        &self.servers
    }

    /// Backend log directory.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Backend cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Backend log level.
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Remote call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the backend loads its cache at start.
    #[must_use]
    pub const fn load_cache_at_start(&self) -> bool {
        self.load_cache_at_start
    }

    /// Capacity of each event outlet.
    #[must_use]
    pub const fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    /// Check that every required setting is present.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in the order: app id, namespace,
    /// log dir, cache dir, servers, event buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::MissingAppId);
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::missing("namespace", vars::NAMESPACE));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::missing("log dir", vars::LOG_DIR));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::missing("cache dir", vars::CACHE_DIR));
        }
        if self.servers.is_empty() {
            return Err(ConfigError::missing("servers", vars::SERVERS));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::invalid_value(
                "event buffer",
                "0",
                "outlets need room for at least one event",
            ));
        }
        Ok(())
    }

    /// Load from the process environment and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or a required one is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from the process environment, falling back to a `.env` file for
    /// variables the environment does not set. The process environment is
    /// not modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged settings are invalid.
    #[cfg(feature = "dotenv")]
    pub fn from_env_with_dotenv(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let dotenv_err = |source| ConfigError::Dotenv {
            path: path.display().to_string(),
            source,
        };

        let file_vars = dotenvy::from_path_iter(path)
            .map_err(dotenv_err)?
            .collect::<Result<HashMap<String, String>, _>>()
            .map_err(dotenv_err)?;

        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| file_vars.get(name).cloned())
        })
    }

    /// Load from an arbitrary variable lookup and validate.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or a required one is missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(app_id) = get(vars::APP_ID) {
            config.app_id = app_id;
        }
        if let Some(namespace) = get(vars::NAMESPACE) {
            config.namespace = namespace;
        }
        if let Some(servers) = get(vars::SERVERS) {
            config.servers = parse_servers(&servers)?;
        }
        if let Some(dir) = get(vars::LOG_DIR) {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(vars::CACHE_DIR) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(level) = get(vars::LOG_LEVEL) {
            config.log_level = level.parse()?;
        }
        if let Some(ms) = get(vars::TIMEOUT_MS) {
            let ms = Value::new(ms.as_str()).int::<u64>().map_err(|_| {
                ConfigError::invalid_value(vars::TIMEOUT_MS, ms, "expected milliseconds as an integer")
            })?;
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(flag) = get(vars::NO_CACHE) {
            let no_cache = Value::new(flag.as_str()).bool().map_err(|_| {
                ConfigError::invalid_value(vars::NO_CACHE, flag, "expected true or false")
            })?;
            config.load_cache_at_start = !no_cache;
        }
        if let Some(size) = get(vars::EVENT_BUFFER) {
            config.event_buffer = Value::new(size.as_str()).int::<usize>().map_err(|_| {
                ConfigError::invalid_value(vars::EVENT_BUFFER, size, "expected a positive integer")
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// CLI flags for [`ClientConfig`], each with an environment fallback.
///
/// Flatten into an application's own parser:
///
/// ```rust,ignore
/// #[derive(clap::Parser)]
/// struct Cli {
///     #[command(flatten)]
///     confwatch: confwatch::ClientArgs,
/// }
///
/// let config = Cli::parse().confwatch.into_config()?;
/// ```
#[cfg(feature = "clap")]
#[derive(Clone, Debug, Default, clap::Args)]
pub struct ClientArgs {
    /// Application id (remote group).
    #[arg(long = "app-id", env = "APP_ID")]
    pub app_id: Option<String>,

    /// Comma-separated remote server URLs.
    #[arg(long = "confwatch-servers", env = "CONFWATCH_SERVERS")]
    pub servers: Option<String>,

    /// Remote namespace.
    #[arg(long = "confwatch-namespace", env = "CONFWATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Backend log directory.
    #[arg(long = "confwatch-log-dir", env = "CONFWATCH_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Backend cache directory.
    #[arg(long = "confwatch-cache-dir", env = "CONFWATCH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Backend log level: debug, info, warn or error.
    #[arg(
        long = "confwatch-log-level",
        env = "CONFWATCH_LOG_LEVEL",
        default_value = "info"
    )]
    pub log_level: String,

    /// Remote call timeout in milliseconds.
    #[arg(
        long = "confwatch-timeout",
        env = "CONFWATCH_TIMEOUT_MS",
        default_value_t = 5000
    )]
    pub timeout_ms: u64,

    /// Do not load the backend cache at start.
    #[arg(long = "confwatch-nocache", env = "CONFWATCH_NO_CACHE")]
    pub no_cache: bool,

    /// Capacity of each event outlet.
    #[arg(
        long = "confwatch-event-buffer",
        env = "CONFWATCH_EVENT_BUFFER",
        default_value_t = DEFAULT_EVENT_BUFFER
    )]
    pub event_buffer: usize,
}

#[cfg(feature = "clap")]
impl ClientArgs {
    /// Convert the parsed flags into a validated [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if a value is malformed or a required one is missing.
    pub fn into_config(self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::default()
            .with_log_level(self.log_level.parse()?)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_load_cache_at_start(!self.no_cache)
            .with_event_buffer(self.event_buffer);

        if let Some(app_id) = self.app_id {
            config = config.with_app_id(app_id);
        }
        if let Some(namespace) = self.namespace {
            config = config.with_namespace(namespace);
        }
        if let Some(servers) = self.servers {
            config = config.with_servers(&servers)?;
        }
        if let Some(dir) = self.log_dir {
            config = config.with_log_dir(dir);
        }
        if let Some(dir) = self.cache_dir {
            config = config.with_cache_dir(dir);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 5] = [
        (vars::APP_ID, "billing"),
        (vars::NAMESPACE, "prod"),
        (vars::SERVERS, "http://10.0.0.1:8848"),
        (vars::LOG_DIR, "/tmp/log"),
        (vars::CACHE_DIR, "/tmp/cache"),
    ];

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(5000));
        assert_eq!(config.event_buffer(), 10);
        assert_eq!(config.log_level(), LogLevel::Info);
        assert!(config.load_cache_at_start());
    }

    #[test]
    fn test_validate_order() {
        let config = ClientConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingAppId)));

        let config = config.with_app_id("billing");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing {
                setting: "namespace",
                ..
            })
        ));

        let config = config.with_namespace("prod").with_log_dir("/tmp/log");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing {
                setting: "cache dir",
                ..
            })
        ));

        let config = config.with_cache_dir("/tmp/cache");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing {
                setting: "servers",
                ..
            })
        ));

        let config = config
            .with_server(ServerAddr::parse("10.0.0.1:8848").unwrap())
            .with_event_buffer(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        assert!(config.with_event_buffer(1).validate().is_ok());
    }

    #[test]
    fn test_server_parse() {
        let server = ServerAddr::parse("https://cfg.example.com:9000/config").unwrap();
        assert_eq!(server.scheme, "https");
        assert_eq!(server.host, "cfg.example.com");
        assert_eq!(server.port, 9000);
        assert_eq!(server.context_path, "/config");
        assert_eq!(server.to_string(), "https://cfg.example.com:9000/config");
    }

    #[test]
    fn test_server_parse_defaults() {
        let server = ServerAddr::parse("10.0.0.7:8848").unwrap();
        assert_eq!(server.scheme, "http");
        assert_eq!(server.port, 8848);
        assert_eq!(server.context_path, "");

        let server = ServerAddr::parse("http://cfg.internal").unwrap();
        assert_eq!(server.port, 80);

        let server = ServerAddr::parse("grpc://cfg.internal").unwrap();
        assert_eq!(server.port, DEFAULT_SERVER_PORT);
    }

    #[test]
    fn test_parse_servers_list() {
        let servers = parse_servers("http://a:1, http://b:2 ,").unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].host, "b");

        assert!(matches!(
            parse_servers(" , "),
            Err(ConfigError::Missing { .. })
        ));
        assert!(matches!(
            parse_servers("http://ok:1,http://bad host"),
            Err(ConfigError::InvalidServer { .. })
        ));
    }

    #[test]
    fn test_from_lookup_required() {
        let config = ClientConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.app_id(), "billing");
        assert_eq!(config.namespace(), "prod");
        assert_eq!(config.servers()[0].port, 8848);
        assert_eq!(config.log_dir(), Path::new("/tmp/log"));
    }

    #[test]
    fn test_from_lookup_optional() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            (vars::LOG_LEVEL, "WARN"),
            (vars::TIMEOUT_MS, "1500"),
            (vars::NO_CACHE, "true"),
            (vars::EVENT_BUFFER, "32"),
        ]);

        let config = ClientConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.log_level(), LogLevel::Warn);
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert!(!config.load_cache_at_start());
        assert_eq!(config.event_buffer(), 32);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((vars::TIMEOUT_MS, "soon"));
        let err = ClientConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains(vars::TIMEOUT_MS));

        let mut pairs = REQUIRED.to_vec();
        pairs.push((vars::LOG_LEVEL, "loud"));
        assert!(ClientConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_from_lookup_blank_is_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = (vars::APP_ID, "  ");
        assert!(matches!(
            ClientConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::MissingAppId)
        ));
    }

    #[test]
    fn test_log_level_round_trip_names() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }
}
