//! Protocol Module
//!
//! Defines the command/reply model exchanged with the upstream service.
//!
//! ### Commands
//! - GET / SET              - whole-block read and write
//! - GETRANGE / SETRANGE    - sub-block read and write
//! - EXISTS / DEL           - key probes and removal
//! - ZADD / ZREMRANGEBYRANK / ZREVRANGE - order-statistic set for file length
//! - MULTI / EXEC           - transactional wrapper
//! - PING                   - health check
//!
//! ### Replies
//! nil, string, integer, status, array, error
//!
//! The codec converts to and from RESP values of the `redis` crate.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::Reply;
pub use codec::{encode_command, from_value, to_redis_cmd};
