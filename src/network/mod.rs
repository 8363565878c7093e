//! Network Module
//!
//! Upstream connection handling.
//!
//! ## Architecture
//! - One connection per open file, exclusively owned by that file handle
//! - `send` appends a command without waiting for its reply
//! - `recv` returns the next reply in submission order (strict FIFO)

mod connection;

pub use connection::{RedisConnection, RedisConnector};

use crate::error::Result;
use crate::protocol::{Command, Reply};

/// A single ordered command/reply stream to the upstream service
pub trait KvConnection {
    /// Append a command to the outbound stream without waiting for a reply
    fn send(&mut self, command: &Command) -> Result<()>;

    /// Block until the next reply arrives
    fn recv(&mut self) -> Result<Reply>;
}

impl<C: KvConnection + ?Sized> KvConnection for &mut C {
    fn send(&mut self, command: &Command) -> Result<()> {
        (**self).send(command)
    }

    fn recv(&mut self) -> Result<Reply> {
        (**self).recv()
    }
}

impl<C: KvConnection + ?Sized> KvConnection for Box<C> {
    fn send(&mut self, command: &Command) -> Result<()> {
        (**self).send(command)
    }

    fn recv(&mut self) -> Result<Reply> {
        (**self).recv()
    }
}

/// Creates fresh upstream connections
pub trait ConnectionFactory {
    type Connection: KvConnection;

    fn connect(&self) -> Result<Self::Connection>;
}
