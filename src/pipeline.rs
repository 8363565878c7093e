//! Pipeline executor
//!
//! Queues commands on one connection without waiting, then drains exactly as
//! many replies in submission order.
//!
//! ```text
//! queue(A) queue(B) queue(C)      drain(3)
//!    │        │        │             │
//!    ▼        ▼        ▼             ▼
//! ──A────────B────────C──────▶  ◀──rA──rB──rC──
//! ```
//!
//! No reordering, no retry, no partial replay. A connection fault while
//! queuing or draining leaves every undrained reply indeterminate; the caller
//! must surface it and stop using the connection.

use crate::error::{Result, VfsError};
use crate::network::KvConnection;
use crate::protocol::{Command, Reply};

/// Position of a queued command within its pipeline
pub type Handle = usize;

/// Pipelined command batch over an exclusively borrowed connection
pub struct Pipeline<'c, C: KvConnection + ?Sized> {
    conn: &'c mut C,

    /// Commands queued so far
    queued: usize,

    /// Replies drained so far
    drained: usize,
}

impl<'c, C: KvConnection + ?Sized> Pipeline<'c, C> {
    pub fn new(conn: &'c mut C) -> Self {
        Self {
            conn,
            queued: 0,
            drained: 0,
        }
    }

    /// Append a command without waiting for its reply
    ///
    /// Returns the handle (submission index) of the command.
    pub fn queue(&mut self, command: &Command) -> Result<Handle> {
        self.conn.send(command)?;
        let handle = self.queued;
        self.queued += 1;
        tracing::trace!("queued #{} {}", handle, command.command_type().name());
        Ok(handle)
    }

    /// Replies still owed by the connection
    pub fn pending(&self) -> usize {
        self.queued - self.drained
    }

    /// Block until the next `n` replies arrive, in submission order
    pub fn drain(&mut self, n: usize) -> Result<Vec<Reply>> {
        if n > self.pending() {
            return Err(VfsError::Protocol(format!(
                "drain of {} replies requested but only {} pending",
                n,
                self.pending()
            )));
        }

        let mut replies = Vec::with_capacity(n);
        for _ in 0..n {
            replies.push(self.conn.recv()?);
            self.drained += 1;
        }
        Ok(replies)
    }

    /// Drain every outstanding reply
    pub fn drain_all(&mut self) -> Result<Vec<Reply>> {
        self.drain(self.pending())
    }
}

/// Queue every command, then drain all replies in order
///
/// Queuing stops at the first failure; nothing is drained in that case.
pub fn execute<C: KvConnection + ?Sized>(conn: &mut C, commands: &[Command]) -> Result<Vec<Reply>> {
    let mut pipeline = Pipeline::new(conn);
    for command in commands {
        pipeline.queue(command)?;
    }
    pipeline.drain_all()
}

/// Send one command and wait for its reply
///
/// Must not be mixed with an undrained pipeline on the same connection.
pub fn synchronous<C: KvConnection + ?Sized>(conn: &mut C, command: &Command) -> Result<Reply> {
    conn.send(command)?;
    conn.recv()
}
