//! Size tracking
//!
//! Race-free "at least" file length kept in an order-statistic set.
//!
//! ## Layout
//! The size key holds a sorted set whose members are lengths scored by their
//! own value. After every trim exactly one member survives: the largest
//! length ever reported.
//!
//! ## Growth
//! `increase_to(n)` is `ZADD key n n` followed by `ZREMRANGEBYRANK key 0 -2`.
//! Any interleaving of these pairs from any number of writers ends with the
//! global maximum as the single survivor: a trim only ever removes members
//! ranked below the current top. No read is needed on the write path.
//!
//! ## Shrinking
//! `force_set(n)` wraps `DEL` plus the growth pair in MULTI/EXEC so no other
//! command can land between the clear and the insert. It is not safe against
//! concurrent writers and is reserved for truncate and delete.

use crate::error::{Result, VfsError};
use crate::keys::{size_key, FileIdentity};
use crate::network::KvConnection;
use crate::pipeline;
use crate::protocol::{Command, Reply};

/// Tracks the length of one file
#[derive(Debug, Clone)]
pub struct SizeTracker {
    key: String,
}

impl SizeTracker {
    pub fn new(file: &FileIdentity) -> Result<Self> {
        Ok(Self {
            key: size_key(file)?,
        })
    }

    /// The size key this tracker maintains
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Record that the file is at least `min_len` bytes long
    pub fn increase_to<C: KvConnection + ?Sized>(&self, conn: &mut C, min_len: u64) -> Result<()> {
        let replies = pipeline::execute(conn, &self.growth_commands(min_len)?)?;
        tracing::trace!("{} increase_to {}", self.key, min_len);

        for (reply, name) in replies.iter().zip(["ZADD", "ZREMRANGEBYRANK"]) {
            expect_integer(reply, name, &self.key)?;
        }
        Ok(())
    }

    /// Current best-known length; 0 if the file has never been sized
    pub fn current_size<C: KvConnection + ?Sized>(&self, conn: &mut C) -> Result<u64> {
        let reply = pipeline::synchronous(
            conn,
            &Command::ZRevRange {
                key: self.key.clone(),
                start: 0,
                stop: 0,
            },
        )?;

        match reply {
            Reply::Array(members) => match members.first() {
                None => Ok(0),
                Some(Reply::Data(member)) => std::str::from_utf8(member)
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or_else(|| {
                        VfsError::SizeUnavailable(format!(
                            "{}: malformed member {:?}",
                            self.key, member
                        ))
                    }),
                Some(other) => Err(VfsError::SizeUnavailable(format!(
                    "{}: unexpected {} member",
                    self.key,
                    other.kind()
                ))),
            },
            Reply::Error(message) => Err(VfsError::SizeUnavailable(format!(
                "{}: {}",
                self.key, message
            ))),
            other => Err(VfsError::SizeUnavailable(format!(
                "{}: unexpected {} reply",
                self.key,
                other.kind()
            ))),
        }
    }

    /// Replace the tracked length with exactly `len`, atomically
    ///
    /// All five replies (MULTI, three QUEUED, EXEC) are drained before any of
    /// them is inspected.
    pub fn force_set<C: KvConnection + ?Sized>(&self, conn: &mut C, len: u64) -> Result<()> {
        let mut commands = Vec::with_capacity(5);
        commands.push(Command::Multi);
        commands.push(Command::Del {
            key: self.key.clone(),
        });
        commands.extend(self.growth_commands(len)?);
        commands.push(Command::Exec);

        let replies = pipeline::execute(conn, &commands)?;
        tracing::debug!("{} force_set {}", self.key, len);

        if !replies[0].is_ok() {
            return Err(self.mismatch("MULTI", &replies[0]));
        }
        for reply in &replies[1..4] {
            if !matches!(reply, Reply::Status(s) if s == "QUEUED") {
                return Err(self.mismatch("queued command", reply));
            }
        }

        match &replies[4] {
            Reply::Array(results) if results.len() == 3 => {
                // DEL of a missing key is fine; only the growth pair matters.
                expect_integer(&results[1], "ZADD", &self.key)?;
                expect_integer(&results[2], "ZREMRANGEBYRANK", &self.key)
            }
            Reply::Nil => Err(VfsError::Protocol(format!(
                "{}: transaction aborted",
                self.key
            ))),
            other => Err(self.mismatch("EXEC", other)),
        }
    }

    fn growth_commands(&self, len: u64) -> Result<[Command; 2]> {
        let score = i64::try_from(len)
            .map_err(|_| VfsError::Protocol(format!("length {len} exceeds score range")))?;

        Ok([
            Command::ZAdd {
                key: self.key.clone(),
                score,
                member: len.to_string(),
            },
            Command::ZRemRangeByRank {
                key: self.key.clone(),
                start: 0,
                stop: -2,
            },
        ])
    }

    fn mismatch(&self, what: &str, reply: &Reply) -> VfsError {
        VfsError::Protocol(format!(
            "{}: unexpected {} reply to {}: {:?}",
            self.key,
            reply.kind(),
            what,
            reply
        ))
    }
}

fn expect_integer(reply: &Reply, command: &str, key: &str) -> Result<()> {
    match reply {
        Reply::Int(_) => Ok(()),
        other => Err(VfsError::Protocol(format!(
            "{key}: unexpected {} reply to {command}: {other:?}",
            other.kind()
        ))),
    }
}
