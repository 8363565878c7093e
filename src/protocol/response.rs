//! Reply definitions
//!
//! Represents replies received from the upstream service.

use bytes::Bytes;

/// A reply to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Missing key / aborted transaction
    Nil,

    /// Binary-safe string payload
    Data(Bytes),

    /// Integer reply
    Int(i64),

    /// Simple status line such as `OK` or `QUEUED`
    Status(String),

    /// Ordered list of nested replies
    Array(Vec<Reply>),

    /// Error reported by the upstream for this command
    Error(String),
}

impl Reply {
    /// Create an OK status reply
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// Create a QUEUED status reply
    pub fn queued() -> Self {
        Reply::Status("QUEUED".to_string())
    }

    /// Create an ERROR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Status(s) if s == "OK")
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Short type name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Nil => "nil",
            Reply::Data(_) => "string",
            Reply::Int(_) => "integer",
            Reply::Status(_) => "status",
            Reply::Array(_) => "array",
            Reply::Error(_) => "error",
        }
    }
}
