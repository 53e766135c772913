//! Connection configuration.
//!
//! A [`ConnectionTarget`] is parsed from a single address string of the form
//! `host:port/database` (a `mongodb://` prefix is tolerated and the port defaults to
//! 27017). [`ConnectionOptions`] tune the session and are applied by backends that support
//! them.

use std::{fmt, str::FromStr, time::Duration};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Where to connect: a host, a port and the database to use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl ConnectionTarget {
    pub const DEFAULT_PORT: u16 = 27017;
    const SCHEME: &'static str = "mongodb://";

    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self { host: host.into(), port, database: database.into() }
    }

    /// Parses `host[:port]/database`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] if the host or database is missing, the
    /// port is not a number, or the address carries anything beyond these three parts.
    pub fn parse(address: &str) -> DocumentStoreResult<Self> {
        let invalid = |reason: &str| {
            DocumentStoreError::Configuration(format!("invalid connection target \"{address}\": {reason}"))
        };

        let rest = address.trim();
        let rest = rest.strip_prefix(Self::SCHEME).unwrap_or(rest);

        let (authority, database) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing database name"))?;

        if database.is_empty() {
            return Err(invalid("missing database name"));
        }
        if database.contains(['/', '?', ' ', '.', '$']) {
            return Err(invalid("malformed database name"));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>()
                    .map_err(|_| invalid("port must be a number between 0 and 65535"))?,
            ),
            None => (authority, Self::DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self::new(host, port, database))
    }

    /// Returns the `mongodb://host:port` URI of the server.
    pub fn server_uri(&self) -> String {
        format!("{}{}:{}", Self::SCHEME, self.host, self.port)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

impl FromStr for ConnectionTarget {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Session options.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    /// Application name reported to the server.
    pub app_name: Option<String>,
    /// Time allowed to establish a connection.
    pub connect_timeout: Option<Duration>,
    /// Time allowed to find a usable server for an operation.
    pub server_selection_timeout: Option<Duration>,
    /// Upper bound on pooled connections (driver default when `None`).
    pub max_pool_size: Option<u32>,
}

impl ConnectionOptions {
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::default()
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            app_name: Some("docmodel".to_string()),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            max_pool_size: None,
        }
    }
}

/// Builder for [`ConnectionOptions`]; unset values keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptionsBuilder {
    options: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.options.app_name = Some(app_name.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = Some(timeout);
        self
    }

    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.options.server_selection_timeout = Some(timeout);
        self
    }

    pub fn with_max_pool_size(mut self, size: u32) -> Self {
        self.options.max_pool_size = Some(size);
        self
    }

    pub fn build(self) -> ConnectionOptions {
        self.options
    }
}
