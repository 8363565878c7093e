//! Redis Connection
//!
//! Explicitly pipelined connection to a Redis-compatible upstream.

use crate::config::Config;
use crate::error::{Result, VfsError};
use crate::protocol::{encode_command, from_value, Command, Reply};

use super::{ConnectionFactory, KvConnection};

/// Synchronous connection to one upstream instance
///
/// Commands are written as soon as they are sent; replies are read lazily by
/// `recv`, which is what makes pipelining explicit.
pub struct RedisConnection {
    /// Underlying redis connection
    conn: redis::Connection,

    /// Upstream address for logging
    peer_addr: String,

    /// Commands sent whose replies have not been read yet
    in_flight: usize,
}

impl RedisConnection {
    /// Connect using the given config
    ///
    /// Applies the connect timeout, then the socket read/write timeouts.
    pub fn connect(config: &Config) -> Result<Self> {
        let peer_addr = format!("{}:{}", config.host, config.port);

        let client = redis::Client::open(config.connection_info())
            .map_err(|e| VfsError::Config(format!("invalid upstream {peer_addr}: {e}")))?;

        let conn = match config.connect_timeout() {
            Some(timeout) => client.get_connection_with_timeout(timeout),
            None => client.get_connection(),
        }
        .map_err(|e| VfsError::Connection(format!("connect to {peer_addr} failed: {e}")))?;

        conn.set_read_timeout(config.read_timeout())?;
        conn.set_write_timeout(config.write_timeout())?;

        tracing::debug!("Connected to upstream {}", peer_addr);

        Ok(Self {
            conn,
            peer_addr,
            in_flight: 0,
        })
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl KvConnection for RedisConnection {
    fn send(&mut self, command: &Command) -> Result<()> {
        let packed = encode_command(command);
        self.conn.send_packed_command(&packed).map_err(|e| {
            tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
            VfsError::Connection(e.to_string())
        })?;
        self.in_flight += 1;
        Ok(())
    }

    fn recv(&mut self) -> Result<Reply> {
        if self.in_flight == 0 {
            return Err(VfsError::Protocol(format!(
                "no reply pending from {}",
                self.peer_addr
            )));
        }

        let reply = match self.conn.recv_response() {
            Ok(value) => from_value(value),
            // Error replies may surface as Err depending on the reply parser;
            // only transport failures are connection faults.
            Err(e) => match VfsError::from(e) {
                VfsError::Protocol(message) => Reply::Error(message),
                fault => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, fault);
                    return Err(fault);
                }
            },
        };
        self.in_flight -= 1;
        Ok(reply)
    }
}

impl Drop for RedisConnection {
    fn drop(&mut self) {
        if self.in_flight > 0 {
            tracing::debug!(
                "Dropping connection to {} with {} unread replies",
                self.peer_addr,
                self.in_flight
            );
        }
    }
}

/// Opens a new [`RedisConnection`] per file handle
#[derive(Debug, Clone, Default)]
pub struct RedisConnector {
    config: Config,
}

impl RedisConnector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl ConnectionFactory for RedisConnector {
    type Connection = RedisConnection;

    fn connect(&self) -> Result<Self::Connection> {
        RedisConnection::connect(&self.config)
    }
}
