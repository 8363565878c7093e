//! Engine Module
//!
//! Block I/O over the remote key-value store.
//!
//! ## Responsibilities
//! - Split byte ranges into block spans and derive their keys
//! - Queue one command per span, pipelined in bounded batches
//! - Reconcile replies in order, keeping the connection aligned on failure
//! - Advance the tracked size right after data has landed
//!
//! ## Per-call state machine
//! ```text
//! QUEUEING ──queue failure──▶ FAILED (connection unusable)
//!    │
//!    ▼
//! DRAINING ──every reply drained, then reconciled──▶ DONE | FAILED
//! ```

use bytes::Bytes;

use crate::error::{Result, VfsError};
use crate::keys::{block_key, FileIdentity};
use crate::network::KvConnection;
use crate::pipeline::{self, Pipeline};
use crate::protocol::{Command, Reply};
use crate::range::{BlockSpans, BlockSpan, SpanKind};
use crate::size::SizeTracker;

/// Most sub-operations queued before their replies are drained
///
/// Larger ranges take several round trips, so neither socket buffer fills up
/// while the upstream waits for its replies to be read.
pub const MAX_SPANS_PER_ROUND_TRIP: usize = 256;

/// Outcome of a read that recovered at least some bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Every requested byte was read
    Complete,

    /// Only the first `verified` bytes are backed by stored data; the rest of
    /// the buffer is zero-filled
    Short { verified: usize },
}

impl ReadStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ReadStatus::Complete)
    }
}

/// One queued sub-operation: the span it covers and the command for it
#[derive(Debug)]
struct PendingOp {
    span: BlockSpan,
    key: String,
    command: Command,
}

/// An open virtual file
///
/// Owns its upstream connection exclusively; every call borrows it for one
/// pipelined round trip per [`MAX_SPANS_PER_ROUND_TRIP`] blocks (plus one for
/// size tracking after a write).
///
/// ## Consistency
/// After a write, the size is advanced to `offset + accepted_bytes` before the
/// call returns, and never past what the upstream acknowledged. This holds for
/// a single upstream instance only.
pub struct BlockFile<C: KvConnection> {
    /// Namespace of every key this file touches
    identity: FileIdentity,

    /// Upstream connection (exclusive)
    conn: C,

    /// Length bookkeeping on the size key
    size: SizeTracker,

    /// Set after a connection fault; the reply stream is no longer trusted
    broken: bool,
}

impl<C: KvConnection> BlockFile<C> {
    /// Open a file over an established connection
    pub fn open(identity: FileIdentity, conn: C) -> Result<Self> {
        let size = SizeTracker::new(&identity)?;
        tracing::debug!("Opened {}", identity);
        Ok(Self {
            identity,
            conn,
            size,
            broken: false,
        })
    }

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// The buffer is zero-filled first, so any unread tail reads as zeros.
    /// Returns `ReadFailed` if no byte at all could be recovered. Ranges over
    /// [`MAX_SPANS_PER_ROUND_TRIP`] blocks are fetched in several round trips.
    pub fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<ReadStatus> {
        self.guard()?;
        let end = checked_end(offset, buf.len())?;
        let ops = self.plan_read(offset, end)?;

        tracing::debug!(
            "{} read [{}..{}) as {} sub-ranges",
            self.identity,
            offset,
            end,
            ops.len()
        );

        let replies = self.run(&ops)?;
        buf.fill(0);

        let mut verified = 0usize;
        let mut continuous = true;

        for (op, reply) in ops.iter().zip(replies) {
            match reply {
                Reply::Data(data) => {
                    if data.len() > op.span.len {
                        tracing::warn!("{} reply overflow: {} > {}", op.key, data.len(), op.span.len);
                        return Err(VfsError::ReplyOverflow {
                            key: op.key.clone(),
                            expected: op.span.len,
                            actual: data.len(),
                        });
                    }
                    if !continuous {
                        tracing::trace!("{} dropped, continuity already broken", op.key);
                        continue;
                    }

                    let range = op.span.buffer_range(offset);
                    buf[range.start..range.start + data.len()].copy_from_slice(&data);
                    verified += data.len();

                    if data.len() < op.span.len {
                        tracing::debug!(
                            "{} short: {} of {} bytes",
                            op.key,
                            data.len(),
                            op.span.len
                        );
                        continuous = false;
                    }
                }
                Reply::Nil => {
                    if continuous {
                        tracing::debug!("{} not found", op.key);
                    }
                    continuous = false;
                }
                other => {
                    tracing::warn!("{} unexpected {} reply to read", op.key, other.kind());
                    return Err(VfsError::Protocol(format!(
                        "{}: unexpected {} reply to {}: {:?}",
                        op.key,
                        other.kind(),
                        op.command.command_type().name(),
                        other
                    )));
                }
            }
        }

        if verified == buf.len() {
            Ok(ReadStatus::Complete)
        } else if verified > 0 {
            Ok(ReadStatus::Short { verified })
        } else {
            Err(VfsError::ReadFailed {
                offset,
                len: buf.len(),
            })
        }
    }

    /// Write `buf` starting at `offset`
    ///
    /// Succeeds only if every sub-range was accepted. The tracked size grows
    /// to cover the accepted prefix even when a later sub-range failed.
    pub fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.guard()?;
        let end = checked_end(offset, buf.len())?;
        let ops = self.plan_write(buf, offset, end)?;

        tracing::debug!(
            "{} write [{}..{}) as {} sub-ranges",
            self.identity,
            offset,
            end,
            ops.len()
        );

        let replies = self.run(&ops)?;

        let mut written = 0usize;
        let mut failure: Option<VfsError> = None;

        for (op, reply) in ops.iter().zip(replies) {
            if failure.is_some() {
                continue;
            }
            match check_write_reply(op, &reply) {
                Ok(()) => written += op.span.len,
                Err(e) => {
                    tracing::warn!("{} write rejected: {}", op.key, e);
                    failure = Some(e);
                }
            }
        }

        if written > 0 {
            let min_len = offset + written as u64;
            let result = self.size.increase_to(&mut self.conn, min_len);
            self.track(result)?;
        }

        tracing::debug!("{} written {}/{}", self.identity, written, buf.len());

        match failure {
            None => Ok(()),
            Some(VfsError::Protocol(message)) => {
                tracing::warn!(
                    "{} write stopped after {}/{} bytes",
                    self.identity,
                    written,
                    buf.len()
                );
                Err(VfsError::Protocol(format!(
                    "{message} ({written} of {} bytes accepted)",
                    buf.len()
                )))
            }
            Some(_) => Err(VfsError::WriteFailed {
                written,
                requested: buf.len(),
            }),
        }
    }

    /// Current tracked length
    pub fn file_size(&mut self) -> Result<u64> {
        self.guard()?;
        let result = self.size.current_size(&mut self.conn);
        self.track(result)
    }

    /// Shrink the tracked length to `new_len`
    ///
    /// Growth is rejected. Block keys past `new_len` are left in place; only
    /// the tracked length changes.
    pub fn truncate(&mut self, new_len: u64) -> Result<()> {
        let current = self.file_size()?;
        if new_len > current {
            return Err(VfsError::TruncateGrowth {
                current,
                requested: new_len,
            });
        }
        self.force_set_size(new_len)
    }

    /// Reset the tracked length to zero
    ///
    /// Block keys are not enumerated or removed.
    pub fn delete(&mut self) -> Result<()> {
        self.force_set_size(0)
    }

    /// Set the tracked length to exactly `len`, bypassing the growth-only rule
    pub fn force_set_size(&mut self, len: u64) -> Result<()> {
        self.guard()?;
        let result = self.size.force_set(&mut self.conn, len);
        self.track(result)
    }

    /// Whether the block containing `offset` has ever been written
    pub fn block_exists(&mut self, offset: u64) -> Result<bool> {
        self.guard()?;
        let key = block_key(&self.identity, offset)?;
        let result = pipeline::synchronous(&mut self.conn, &Command::Exists { key: key.clone() });

        match self.track(result)? {
            Reply::Int(n) => Ok(n > 0),
            other => Err(VfsError::Protocol(format!(
                "{key}: unexpected {} reply to EXISTS",
                other.kind()
            ))),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn identity(&self) -> &FileIdentity {
        &self.identity
    }

    pub fn size_tracker(&self) -> &SizeTracker {
        &self.size
    }

    /// Whether an earlier connection fault made this handle unusable
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Give back the connection (e.g. to reuse it for another file)
    pub fn into_connection(self) -> C {
        self.conn
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn plan_read(&self, offset: u64, end: u64) -> Result<Vec<PendingOp>> {
        BlockSpans::new(offset, end)
            .map(|span| {
                let key = block_key(&self.identity, span.offset)?;
                let command = match span.kind {
                    SpanKind::Full => Command::Get { key: key.clone() },
                    SpanKind::Partial { first, last } => Command::GetRange {
                        key: key.clone(),
                        first: first as i64,
                        last: last as i64,
                    },
                };
                Ok(PendingOp { span, key, command })
            })
            .collect()
    }

    fn plan_write(&self, buf: &[u8], offset: u64, end: u64) -> Result<Vec<PendingOp>> {
        BlockSpans::new(offset, end)
            .map(|span| {
                let key = block_key(&self.identity, span.offset)?;
                let value = Bytes::copy_from_slice(&buf[span.buffer_range(offset)]);
                let command = match span.kind {
                    SpanKind::Full => Command::Set {
                        key: key.clone(),
                        value,
                    },
                    SpanKind::Partial { first, .. } => Command::SetRange {
                        key: key.clone(),
                        offset: first as u64,
                        value,
                    },
                };
                Ok(PendingOp { span, key, command })
            })
            .collect()
    }

    /// Queue each batch of ops, then drain its replies
    fn run(&mut self, ops: &[PendingOp]) -> Result<Vec<Reply>> {
        let mut replies = Vec::with_capacity(ops.len());

        for batch in ops.chunks(MAX_SPANS_PER_ROUND_TRIP) {
            match run_batch(&mut self.conn, batch) {
                Ok(batch_replies) => replies.extend(batch_replies),
                Err(e) => {
                    tracing::warn!("{} pipeline failed: {}", self.identity, e);
                    self.broken = true;
                    return Err(e);
                }
            }
        }
        Ok(replies)
    }

    fn guard(&self) -> Result<()> {
        if self.broken {
            return Err(VfsError::ConnectionBroken);
        }
        Ok(())
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connection_fault() {
                tracing::warn!("{} connection fault: {}", self.identity, e);
                self.broken = true;
            }
        }
        result
    }
}

/// One pipelined round trip; queuing stops at the first failure
fn run_batch<C: KvConnection>(conn: &mut C, batch: &[PendingOp]) -> Result<Vec<Reply>> {
    let mut pipeline = Pipeline::new(conn);
    for op in batch {
        pipeline.queue(&op.command)?;
    }
    pipeline.drain_all()
}

fn checked_end(offset: u64, len: usize) -> Result<u64> {
    offset
        .checked_add(len as u64)
        .ok_or(VfsError::RangeOverflow { offset, len })
}

/// Validate the reply to one write sub-operation
///
/// Error replies reject the sub-range; any other unexpected shape is a
/// protocol mismatch.
fn check_write_reply(op: &PendingOp, reply: &Reply) -> Result<()> {
    let accepted = match (&op.span.kind, reply) {
        (_, Reply::Error(message)) => {
            tracing::debug!("{} upstream error: {}", op.key, message);
            return Err(VfsError::WriteFailed {
                written: 0,
                requested: op.span.len,
            });
        }
        (SpanKind::Full, reply) => reply.is_ok(),
        (SpanKind::Partial { first, .. }, Reply::Int(new_len)) => {
            *new_len >= (*first + op.span.len) as i64
        }
        (SpanKind::Partial { .. }, _) => false,
    };

    if accepted {
        Ok(())
    } else {
        Err(VfsError::Protocol(format!(
            "{}: unexpected {} reply to {}: {:?}",
            op.key,
            reply.kind(),
            op.command.command_type().name(),
            reply
        )))
    }
}
