//! Protocol codec
//!
//! Conversion between the command/reply model and RESP.
//!
//! ## Wire Format
//!
//! Every command is sent as a RESP array of bulk strings:
//! ```text
//! *3\r\n $3\r\nGET\r\n ...
//! ┌────────────┬──────────────┬─────────────┬─────
//! │ *<argc>\r\n│ $<len>\r\n   │ <arg>\r\n   │ ...
//! └────────────┴──────────────┴─────────────┴─────
//! ```
//! Framing itself is delegated to the `redis` crate; this module only decides
//! the argument vector and how each RESP reply maps onto [`Reply`].

use bytes::Bytes;
use redis::Value;

use super::{Command, Reply};

/// Build the `redis` command for a [`Command`]
pub fn to_redis_cmd(command: &Command) -> redis::Cmd {
    let mut cmd = redis::cmd(command.command_type().name());

    match command {
        Command::Get { key } | Command::Exists { key } | Command::Del { key } => {
            cmd.arg(key.as_str());
        }
        Command::Set { key, value } => {
            cmd.arg(key.as_str()).arg(value.as_ref());
        }
        Command::GetRange { key, first, last } => {
            cmd.arg(key.as_str()).arg(*first).arg(*last);
        }
        Command::SetRange { key, offset, value } => {
            cmd.arg(key.as_str()).arg(*offset).arg(value.as_ref());
        }
        Command::ZAdd { key, score, member } => {
            cmd.arg(key.as_str()).arg(*score).arg(member.as_str());
        }
        Command::ZRemRangeByRank { key, start, stop }
        | Command::ZRevRange { key, start, stop } => {
            cmd.arg(key.as_str()).arg(*start).arg(*stop);
        }
        Command::Multi | Command::Exec | Command::Ping => {}
    }

    cmd
}

/// Encode a command as packed RESP bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    to_redis_cmd(command).get_packed_command()
}

/// Map a RESP reply onto [`Reply`]
///
/// RESP3-only shapes that the block engine never requests are reported as
/// error replies so callers treat them as protocol mismatches.
pub fn from_value(value: Value) -> Reply {
    match value {
        Value::Nil => Reply::Nil,
        Value::Int(n) => Reply::Int(n),
        Value::BulkString(data) => Reply::Data(Bytes::from(data)),
        Value::SimpleString(status) => Reply::Status(status),
        Value::Okay => Reply::ok(),
        Value::Array(items) | Value::Set(items) => {
            Reply::Array(items.into_iter().map(from_value).collect())
        }
        Value::VerbatimString { text, .. } => Reply::Data(Bytes::from(text.into_bytes())),
        Value::ServerError(err) => Reply::Error(format!("{err:?}")),
        other => Reply::Error(format!("unsupported reply shape: {other:?}")),
    }
}
