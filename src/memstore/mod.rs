//! MemStore Module
//!
//! In-process key-value store speaking the same command/reply model as the
//! upstream service.
//!
//! ## Responsibilities
//! - Strings with whole-value and ranged reads/writes
//! - Order-statistic sets (ZADD / ZREMRANGEBYRANK / ZREVRANGE)
//! - MULTI/EXEC transactions applied atomically per connection
//! - Redis reply semantics, so the block engine can run without a server
//!
//! ## Data Structure Choice
//! A `HashMap` behind a `parking_lot::RwLock`, shared by every connection:
//! - Reads take the read lock; writes and transactions take the write lock
//! - Sorted sets keep a `BTreeSet<(score, member)>` for rank order

mod store;

pub use store::{MemStore, MemoryConnection};
