//! # blockvfs
//!
//! A block-addressable virtual file backed by a remote key-value store:
//! - Deterministic per-block keys derived from a file identity
//! - Byte ranges split into block-aligned sub-operations
//! - Pipelined round trips of bounded depth, replies reconciled in order
//! - Race-free monotonic file length kept in an order-statistic set
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Host file-I/O layer                         │
//! │              (VfsFile / BlockVfs capability)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  BlockFile (engine)                          │
//! │        read / write / file_size / truncate / delete          │
//! └──────┬───────────────────┬──────────────────────┬───────────┘
//!        │                   │                      │
//!        ▼                   ▼                      ▼
//!  ┌───────────┐      ┌─────────────┐        ┌─────────────┐
//!  │  range +  │      │ SizeTracker │        │  Pipeline   │
//!  │   keys    │      │ (ZADD/trim) │───────▶│ queue/drain │
//!  └───────────┘      └─────────────┘        └──────┬──────┘
//!                                                   │
//!                                     ┌─────────────▼─────────────┐
//!                                     │  KvConnection             │
//!                                     │  (Redis / MemStore)       │
//!                                     └───────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod keys;
pub mod range;
pub mod protocol;
pub mod network;
pub mod memstore;
pub mod pipeline;
pub mod size;
pub mod engine;
pub mod vfs;
pub mod stream;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VfsError, Result};
pub use config::Config;
pub use engine::{BlockFile, ReadStatus};
pub use keys::{FileIdentity, BLOCK_SIZE};
pub use memstore::MemStore;
pub use network::{ConnectionFactory, KvConnection, RedisConnector};
pub use vfs::{BlockVfs, VfsFile};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockvfs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
