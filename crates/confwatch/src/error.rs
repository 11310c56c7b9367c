//! Error types for the watch client.
//!
//! Errors fall into three groups, each with its own type:
//!
//! | Type | When It Occurs | Surfaced To Caller? |
//! |------|----------------|---------------------|
//! | [`ConfigError`] | Missing or malformed startup parameters | Yes, from constructors and loaders |
//! | [`RemoteError`] | The remote config service failed a call | Only from [`WatchClient::close`](crate::WatchClient::close) |
//! | [`ValueError`] | Cached content could not be decoded | Yes, from [`Value`](crate::Value) accessors |
//!
//! Remote failures on the reload path are never returned: they are logged and
//! the client degrades to a stale cache, a skipped key, or a dropped event.
//!
//! All types integrate with [`miette`] for rich terminal diagnostics.

use std::error::Error as StdError;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building a [`ClientConfig`](crate::ClientConfig) or
/// starting a [`WatchClient`](crate::WatchClient).
///
/// These are fatal: no partial client is created.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    /// The application id (used as the remote group) was not set.
    #[error("application id is not set")]
    #[diagnostic(
        code(confwatch::config::missing_app_id),
        help("set APP_ID or call ClientConfig::with_app_id")
    )]
    MissingAppId,

    /// A required setting was empty.
    #[error("missing required setting: {setting}")]
    #[diagnostic(code(confwatch::config::missing))]
    Missing {
        /// Name of the missing setting.
        setting: &'static str,

        /// Where the setting can be provided.
        #[help]
        help: String,
    },

    /// A server address could not be parsed.
    #[error("invalid server address '{server}': {message}")]
    #[diagnostic(
        code(confwatch::config::invalid_server),
        help("servers are a comma-separated list of URLs, e.g. http://10.0.0.1:8848")
    )]
    InvalidServer {
        /// The offending entry.
        server: String,

        /// Why it was rejected.
        message: String,
    },

    /// A setting had a value of the wrong shape.
    #[error("invalid value for {setting}: '{value}'")]
    #[diagnostic(code(confwatch::config::invalid_value))]
    InvalidValue {
        /// Name of the setting.
        setting: &'static str,

        /// The raw value that was rejected.
        value: String,

        /// What was expected instead.
        #[help]
        help: String,
    },

    /// A `.env` file could not be read or parsed.
    #[cfg(feature = "dotenv")]
    #[error("failed to load dotenv file '{path}'")]
    #[diagnostic(
        code(confwatch::config::dotenv),
        help("check that the file exists and uses KEY=value lines")
    )]
    Dotenv {
        /// Path of the dotenv file.
        path: String,

        /// The underlying dotenvy error.
        #[source]
        source: dotenvy::Error,
    },

    /// The reload dispatcher thread could not be spawned.
    #[error("failed to start reload dispatcher")]
    #[diagnostic(code(confwatch::config::startup))]
    Startup {
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `Missing` error with the environment variable that supplies it.
    pub(crate) fn missing(setting: &'static str, env_var: &str) -> Self {
        Self::Missing {
            setting,
            help: format!("set {env_var} or the matching ClientConfig setter"),
        }
    }

    /// Create an `InvalidServer` error.
    pub(crate) fn invalid_server(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidServer {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create an `InvalidValue` error.
    pub(crate) fn invalid_value(
        setting: &'static str,
        value: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            setting,
            value: value.into(),
            help: help.into(),
        }
    }
}

/// Errors reported by a [`RemoteConfig`](crate::RemoteConfig) implementation.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum RemoteError {
    /// The entry does not exist on the remote service.
    #[error("entry '{key}' not found in group '{group}'")]
    #[diagnostic(code(confwatch::remote::not_found))]
    NotFound {
        /// Application group the entry was looked up in.
        group: String,
        /// The entry key.
        key: String,
    },

    /// The remote service could not be reached.
    #[error("remote '{remote}' connection error: {message}")]
    #[diagnostic(
        code(confwatch::remote::connection),
        help("check the server list and network connectivity")
    )]
    Connection {
        /// Name of the remote backend.
        remote: String,
        /// Human-readable error message.
        message: String,
        /// The underlying transport error.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The call did not complete within the configured timeout.
    #[error("remote call for '{key}' timed out after {after:?}")]
    #[diagnostic(
        code(confwatch::remote::timeout),
        help("raise the client timeout or check remote service health")
    )]
    Timeout {
        /// The entry key.
        key: String,
        /// How long the call ran.
        after: Duration,
    },

    /// The remote service refused the request.
    #[error("remote rejected request for '{key}': {message}")]
    #[diagnostic(code(confwatch::remote::rejected))]
    Rejected {
        /// The entry key.
        key: String,
        /// Reason given by the remote.
        message: String,
    },
}

impl RemoteError {
    /// Create a `NotFound` error.
    pub fn not_found(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            group: group.into(),
            key: key.into(),
        }
    }

    /// Create a `Connection` error without an underlying source.
    pub fn connection(remote: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            remote: remote.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Connection` error wrapping a transport error.
    pub fn connection_with_source(
        remote: impl Into<String>,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            remote: remote.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a `Timeout` error.
    pub fn timeout(key: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            key: key.into(),
            after,
        }
    }

    /// Create a `Rejected` error.
    pub fn rejected(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the entry simply does not exist remotely.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the call was abandoned after the client timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from decoding a cached [`Value`](crate::Value).
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ValueError {
    /// The value is the empty sentinel (never fetched, or the fetch failed).
    #[error("value does not exist")]
    #[diagnostic(
        code(confwatch::value::missing),
        help("the entry was never fetched successfully; check the remote service logs")
    )]
    Missing,

    /// The content could not be parsed as a scalar.
    #[error("cannot parse '{content}' as {expected}")]
    #[diagnostic(code(confwatch::value::parse))]
    Parse {
        /// The content that failed to parse (trimmed).
        content: String,
        /// The expected type name.
        expected: &'static str,
    },

    /// The content could not be decoded as a structured document.
    #[error("failed to decode value as {format}: {message}")]
    #[diagnostic(code(confwatch::value::decode))]
    Decode {
        /// Document format (json, toml, yaml).
        format: &'static str,
        /// Decoder error message.
        message: String,
    },
}

impl ValueError {
    pub(crate) fn parse(content: &str, expected: &'static str) -> Self {
        Self::Parse {
            content: content.trim().to_string(),
            expected,
        }
    }

    pub(crate) fn decode(format: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            format,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::missing("namespace", "CONFWATCH_NAMESPACE");
        assert!(err.to_string().contains("namespace"));

        let err = ConfigError::invalid_server("::bad", "relative URL without a base");
        assert!(err.to_string().contains("::bad"));
    }

    #[test]
    fn test_config_error_help() {
        let err = ConfigError::missing("log dir", "CONFWATCH_LOG_DIR");
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("CONFWATCH_LOG_DIR"));
    }

    #[test]
    fn test_remote_error_helpers() {
        let err = RemoteError::not_found("app", "db.toml");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("db.toml"));

        let err = RemoteError::connection("memory", "refused");
        assert!(!err.is_not_found());
        assert!(err.source().is_none());

        let io = std::io::Error::other("reset by peer");
        let err = RemoteError::connection_with_source("http", "request failed", io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_value_error_trims_content() {
        let err = ValueError::parse("  abc \n", "i64");
        assert_eq!(err.to_string(), "cannot parse 'abc' as i64");
    }
}
