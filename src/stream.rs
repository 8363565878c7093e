//! Stream helpers
//!
//! Move data between `std::io` streams and a [`BlockFile`].

use std::io::{Read, Write};

use crate::engine::{BlockFile, ReadStatus};
use crate::error::{Result, VfsError};
use crate::keys::BLOCK_SIZE;
use crate::network::KvConnection;

/// Blocks moved per pipelined round trip
const BLOCKS_PER_BATCH: usize = 64;

/// Write everything from `reader` into `file` starting at `offset`
///
/// Returns the number of bytes written.
pub fn copy_in<C, R>(file: &mut BlockFile<C>, reader: &mut R, offset: u64) -> Result<u64>
where
    C: KvConnection,
    R: Read,
{
    let mut buf = vec![0u8; BLOCK_SIZE * BLOCKS_PER_BATCH];
    let mut position = offset;

    loop {
        let filled = fill(reader, &mut buf)?;
        if filled == 0 {
            break;
        }
        file.write(&buf[..filled], position)?;
        position += filled as u64;
        if filled < buf.len() {
            break;
        }
    }

    Ok(position - offset)
}

/// Copy the file's tracked length into `writer`
///
/// Returns the number of bytes copied. A short read inside the tracked
/// length is reported as an error rather than padded.
pub fn copy_out<C, W>(file: &mut BlockFile<C>, writer: &mut W) -> Result<u64>
where
    C: KvConnection,
    W: Write,
{
    let len = file.file_size()?;
    let mut buf = vec![0u8; BLOCK_SIZE * BLOCKS_PER_BATCH];
    let mut position = 0u64;

    while position < len {
        let take = (len - position).min(buf.len() as u64) as usize;
        match file.read(&mut buf[..take], position)? {
            ReadStatus::Complete => {}
            ReadStatus::Short { verified } => {
                return Err(VfsError::ReadFailed {
                    offset: position + verified as u64,
                    len: take - verified,
                })
            }
        }
        writer.write_all(&buf[..take])?;
        position += take as u64;
    }

    writer.flush()?;
    Ok(position)
}

/// Read until `buf` is full or the reader is exhausted
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
