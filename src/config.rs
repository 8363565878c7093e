//! Configuration for blockvfs
//!
//! Centralized configuration for the upstream connection with sensible defaults.
//! Block geometry is fixed at compile time (see [`crate::keys`]) and is not
//! part of the configuration.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Result, VfsError};

/// Characters left unescaped in URL userinfo (RFC 3986 unreserved)
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Connection configuration for the upstream key-value service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Upstream Address
    // -------------------------------------------------------------------------
    /// Upstream host name or IP address
    pub host: String,

    /// Upstream TCP port
    pub port: u16,

    /// Logical database index selected after connecting
    pub database: i64,

    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------
    pub username: Option<String>,

    pub password: Option<String>,

    // -------------------------------------------------------------------------
    // Timeouts (0 disables the timeout)
    // -------------------------------------------------------------------------
    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Socket read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            username: None,
            password: None,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a `redis://[user[:password]@]host[:port][/db]` URL
    pub fn from_url(url: &str) -> Result<Self> {
        let info = redis::IntoConnectionInfo::into_connection_info(url)
            .map_err(|e| VfsError::Config(format!("invalid upstream URL {url}: {e}")))?;

        let (host, port) = match info.addr {
            redis::ConnectionAddr::Tcp(host, port) => (host, port),
            other => {
                return Err(VfsError::Config(format!(
                    "unsupported upstream address {other}"
                )))
            }
        };

        Ok(Self {
            host,
            port,
            database: info.redis.db,
            username: info.redis.username,
            password: info.redis.password,
            ..Self::default()
        })
    }

    /// Render the configuration as a connection URL
    ///
    /// Credentials are percent-encoded, so `from_url(connection_url())`
    /// yields the same configuration.
    pub fn connection_url(&self) -> String {
        let user = self.username.as_deref().map(escape_userinfo);
        let pass = self.password.as_deref().map(escape_userinfo);
        let auth = match (user, pass) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (None, Some(pass)) => format!(":{pass}@"),
            (Some(user), None) => format!("{user}@"),
            (None, None) => String::new(),
        };
        format!(
            "redis://{}{}:{}/{}",
            auth, self.host, self.port, self.database
        )
    }

    /// Connection parameters for the `redis` client, built field by field
    pub fn connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: redis::RedisConnectionInfo {
                db: self.database,
                username: self.username.clone(),
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn escape_userinfo(part: &str) -> String {
    utf8_percent_encode(part, USERINFO).to_string()
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the upstream host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the upstream port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the logical database index
    pub fn database(mut self, db: i64) -> Self {
        self.config.database = db;
        self
    }

    pub fn username(mut self, user: impl Into<String>) -> Self {
        self.config.username = Some(user.into());
        self
    }

    pub fn password(mut self, pass: impl Into<String>) -> Self {
        self.config.password = Some(pass.into());
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
