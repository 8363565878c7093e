//! Error types for blockvfs
//!
//! Provides a unified error type for all operations.
//!
//! The variants follow four failure classes:
//! - connection faults (transport failure while queuing or draining)
//! - protocol mismatches (reply shape not valid for the issued command)
//! - invariant violations (overflowing replies, oversized keys)
//! - operation outcomes the host must see (read/write failures, size errors)

use thiserror::Error;

/// Result type alias using VfsError
pub type Result<T> = std::result::Result<T, VfsError>;

/// Unified error type for blockvfs operations
#[derive(Debug, Error)]
pub enum VfsError {
    // -------------------------------------------------------------------------
    // Connection Faults
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection is unusable after an earlier fault")]
    ConnectionBroken,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Invariant Violations
    // -------------------------------------------------------------------------
    #[error("Reply for {key} overflows sub-range: expected at most {expected} bytes, got {actual}")]
    ReplyOverflow {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    #[error("File identity too long: {len} bytes (max {max})")]
    IdentityTooLong { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Block I/O Errors
    // -------------------------------------------------------------------------
    #[error("Read failed: no bytes recoverable in [{offset}, {offset}+{len})")]
    ReadFailed { offset: u64, len: usize },

    #[error("Write failed: {written} of {requested} bytes accepted")]
    WriteFailed { written: usize, requested: usize },

    #[error("Range overflows the file offset space: offset {offset} + {len}")]
    RangeOverflow { offset: u64, len: usize },

    // -------------------------------------------------------------------------
    // Size Tracking Errors
    // -------------------------------------------------------------------------
    #[error("File size unavailable: {0}")]
    SizeUnavailable(String),

    #[error("Cannot grow file via truncate: current size {current}, requested {requested}")]
    TruncateGrowth { current: u64, requested: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VfsError {
    /// Whether this error leaves the connection's reply stream in an unknown state
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            VfsError::Io(_) | VfsError::Connection(_) | VfsError::ConnectionBroken
        )
    }
}

impl From<redis::RedisError> for VfsError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_timeout()
            || err.is_unrecoverable_error()
        {
            VfsError::Connection(err.to_string())
        } else {
            VfsError::Protocol(err.to_string())
        }
    }
}
