//! Command definitions
//!
//! Represents commands sent to the upstream key-value service.

use bytes::Bytes;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Get,
    Set,
    GetRange,
    SetRange,
    Exists,
    Del,
    ZAdd,
    ZRemRangeByRank,
    ZRevRange,
    Multi,
    Exec,
    Ping,
}

impl CommandType {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            CommandType::Get => "GET",
            CommandType::Set => "SET",
            CommandType::GetRange => "GETRANGE",
            CommandType::SetRange => "SETRANGE",
            CommandType::Exists => "EXISTS",
            CommandType::Del => "DEL",
            CommandType::ZAdd => "ZADD",
            CommandType::ZRemRangeByRank => "ZREMRANGEBYRANK",
            CommandType::ZRevRange => "ZREVRANGE",
            CommandType::Multi => "MULTI",
            CommandType::Exec => "EXEC",
            CommandType::Ping => "PING",
        }
    }
}

/// A command for the upstream service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch a whole value
    Get { key: String },

    /// Replace a whole value
    Set { key: String, value: Bytes },

    /// Fetch `first..=last` of a value (inclusive bounds)
    GetRange { key: String, first: i64, last: i64 },

    /// Overwrite part of a value starting at `offset`, zero-padding any gap
    SetRange { key: String, offset: u64, value: Bytes },

    /// Check whether a key exists
    Exists { key: String },

    /// Remove a key
    Del { key: String },

    /// Add or update a member of an order-statistic set
    ZAdd { key: String, score: i64, member: String },

    /// Remove members by rank, `start..=stop` (negative ranks count from the top)
    ZRemRangeByRank { key: String, start: i64, stop: i64 },

    /// Read members by descending rank, `start..=stop`
    ZRevRange { key: String, start: i64, stop: i64 },

    /// Open a transaction block
    Multi,

    /// Execute the open transaction block
    Exec,

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::GetRange { .. } => CommandType::GetRange,
            Command::SetRange { .. } => CommandType::SetRange,
            Command::Exists { .. } => CommandType::Exists,
            Command::Del { .. } => CommandType::Del,
            Command::ZAdd { .. } => CommandType::ZAdd,
            Command::ZRemRangeByRank { .. } => CommandType::ZRemRangeByRank,
            Command::ZRevRange { .. } => CommandType::ZRevRange,
            Command::Multi => CommandType::Multi,
            Command::Exec => CommandType::Exec,
            Command::Ping => CommandType::Ping,
        }
    }

    /// The key this command addresses, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::GetRange { key, .. }
            | Command::SetRange { key, .. }
            | Command::Exists { key }
            | Command::Del { key }
            | Command::ZAdd { key, .. }
            | Command::ZRemRangeByRank { key, .. }
            | Command::ZRevRange { key, .. } => Some(key),
            Command::Multi | Command::Exec | Command::Ping => None,
        }
    }
}
