//! Key derivation
//!
//! Maps a file identity and byte offset onto the remote key namespace.
//!
//! ## Key Layout
//! ```text
//! {identity}:{hex(block_number)}   one string per occupied 1024-byte block
//! {identity}:filelen               order-statistic set holding the length
//! ```
//!
//! The block number is lowercase hex without padding. This layout is the whole
//! remote format, so readers and writers must agree on it byte for byte.

use std::fmt;

use crate::error::{Result, VfsError};

/// Fixed block size shared by every component
pub const BLOCK_SIZE: usize = 1024;

/// Maximum length of a file identity (the key prefix)
pub const MAX_IDENTITY_LEN: usize = 96;

/// Maximum length of any derived key
///
/// `MAX_KEY_LEN - MAX_IDENTITY_LEN` leaves room for the delimiter and the
/// hex block number of any 64-bit offset.
pub const MAX_KEY_LEN: usize = 128;

const SIZE_KEY_SUFFIX: &str = "filelen";

/// Caller-supplied namespace for all keys of one logical file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity(String);

impl FileIdentity {
    /// Validate and wrap an identity
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() > MAX_IDENTITY_LEN {
            return Err(VfsError::IdentityTooLong {
                len: name.len(),
                max: MAX_IDENTITY_LEN,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Index of the block containing `offset`
#[inline]
pub fn block_number(offset: u64) -> u64 {
    offset / BLOCK_SIZE as u64
}

/// First byte offset of the block containing `offset`
#[inline]
pub fn block_start(offset: u64) -> u64 {
    offset - offset % BLOCK_SIZE as u64
}

/// Key of the block containing `offset`
///
/// Any offset is accepted; it is floored to its containing block.
pub fn block_key(file: &FileIdentity, offset: u64) -> Result<String> {
    bounded(format!("{}:{:x}", file.as_str(), block_number(offset)))
}

/// Key of the order-statistic set tracking the file length
pub fn size_key(file: &FileIdentity) -> Result<String> {
    bounded(format!("{}:{}", file.as_str(), SIZE_KEY_SUFFIX))
}

fn bounded(key: String) -> Result<String> {
    debug_assert!(key.len() <= MAX_KEY_LEN, "derived key exceeds budget: {key}");
    if key.len() > MAX_KEY_LEN {
        return Err(VfsError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    Ok(key)
}
