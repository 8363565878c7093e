//! VFS Module
//!
//! The capability surface a host file-I/O layer drives.
//!
//! ## Responsibilities
//! - `VfsFile`: per-file operations (read/write/size/truncate plus the
//!   lock/sync/characteristics entry points a host requires)
//! - `BlockVfs`: file-level operations (open/delete/access/full_pathname)
//!
//! Registration with a particular host (e.g. a database engine's VFS table)
//! belongs to a separate bootstrap layer; nothing here holds global state.

use crate::engine::{BlockFile, ReadStatus};
use crate::error::Result;
use crate::keys::{FileIdentity, BLOCK_SIZE};
use crate::network::{ConnectionFactory, KvConnection};

/// Name reported to hosts that ask which VFS backs a file
pub const VFS_NAME: &str = "blockvfs";

/// Host lock levels, weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockLevel {
    None,
    Shared,
    Reserved,
    Pending,
    Exclusive,
}

/// Device characteristic flags reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCharacteristics(u32);

impl DeviceCharacteristics {
    pub const ATOMIC: Self = Self(0x0000_0001);
    pub const SAFE_APPEND: Self = Self(0x0000_0200);
    pub const SEQUENTIAL: Self = Self(0x0000_0400);
    pub const UNDELETABLE_WHEN_OPEN: Self = Self(0x0000_0800);
    pub const POWERSAFE_OVERWRITE: Self = Self(0x0000_1000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Per-file operations required by the host
pub trait VfsFile {
    /// Read into `buf` from `offset`; any unread tail is zero-filled
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<ReadStatus>;

    /// Write `buf` at `offset`
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()>;

    /// Shrink the file to `size` bytes
    fn truncate(&mut self, size: u64) -> Result<()>;

    /// Flush to stable storage
    fn sync(&mut self) -> Result<()>;

    /// Current file size in bytes
    fn file_size(&mut self) -> Result<u64>;

    fn lock(&mut self, level: LockLevel) -> Result<()>;

    fn unlock(&mut self, level: LockLevel) -> Result<()>;

    /// Whether another connection holds a RESERVED or stronger lock
    fn check_reserved_lock(&mut self) -> Result<bool>;

    /// Minimum write granularity
    fn sector_size(&self) -> u32;

    fn device_characteristics(&self) -> DeviceCharacteristics;

    fn vfs_name(&self) -> &'static str {
        VFS_NAME
    }
}

impl<C: KvConnection> VfsFile for BlockFile<C> {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<ReadStatus> {
        BlockFile::read(self, buf, offset)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        BlockFile::write(self, buf, offset)
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        BlockFile::truncate(self, size)
    }

    // Writes are acknowledged by the upstream before returning.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn file_size(&mut self) -> Result<u64> {
        BlockFile::file_size(self)
    }

    // Single-upstream semantics; locking is not implemented.
    fn lock(&mut self, level: LockLevel) -> Result<()> {
        tracing::debug!("{} lock {:?} (no-op)", self.identity(), level);
        Ok(())
    }

    fn unlock(&mut self, level: LockLevel) -> Result<()> {
        tracing::debug!("{} unlock {:?} (no-op)", self.identity(), level);
        Ok(())
    }

    fn check_reserved_lock(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn sector_size(&self) -> u32 {
        BLOCK_SIZE as u32
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics::ATOMIC
            .union(DeviceCharacteristics::SAFE_APPEND)
            .union(DeviceCharacteristics::SEQUENTIAL)
            .union(DeviceCharacteristics::POWERSAFE_OVERWRITE)
            .union(DeviceCharacteristics::UNDELETABLE_WHEN_OPEN)
    }
}

/// File-level operations over a connection factory
///
/// Every opened file gets its own connection.
#[derive(Debug, Clone)]
pub struct BlockVfs<F: ConnectionFactory> {
    factory: F,
}

impl<F: ConnectionFactory> BlockVfs<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn name(&self) -> &'static str {
        VFS_NAME
    }

    /// Maximum accepted file name length
    pub fn max_pathname(&self) -> usize {
        crate::keys::MAX_IDENTITY_LEN
    }

    /// Open `name` on a fresh connection
    pub fn open(&self, name: &str) -> Result<BlockFile<F::Connection>> {
        let identity = FileIdentity::new(name)?;
        let conn = self.factory.connect()?;
        BlockFile::open(identity, conn)
    }

    /// Reset the tracked length of `name` to zero
    ///
    /// Succeeds whether or not the file existed.
    pub fn delete(&self, name: &str) -> Result<()> {
        tracing::debug!("delete {}", name);
        let mut file = self.open(name)?;
        file.delete()
    }

    /// Whether `name` holds any data (non-zero tracked length)
    pub fn access(&self, name: &str) -> Result<bool> {
        let mut file = self.open(name)?;
        Ok(file.file_size()? > 0)
    }

    /// Names are used verbatim as identities
    pub fn full_pathname(&self, name: &str) -> Result<String> {
        Ok(FileIdentity::new(name)?.as_str().to_string())
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}
