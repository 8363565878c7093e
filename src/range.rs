//! Range splitting
//!
//! Splits an arbitrary `[start, end)` byte range into block-aligned spans.
//!
//! ```text
//!   start                                             end
//!     │                                                │
//! ────┼──────────┬──────────────────────┬──────────────┼───
//!     │ partial  │        full          │   partial    │
//! ────┴──────────┴──────────────────────┴──────────────┴───
//!   block 0        block 1                block 2
//! ```
//!
//! Each span lies inside exactly one block and has a non-zero length. The
//! walk advances by the distance to the next block boundary, so the number of
//! spans is proportional to the number of blocks touched, not to the bytes.

use crate::keys::{block_number, block_start, BLOCK_SIZE};

/// How a span covers its containing block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// The span covers the whole block
    Full,

    /// The span covers `first..=last` inside the block (0-based, inclusive)
    Partial { first: usize, last: usize },
}

/// One block-contained piece of a larger byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Absolute file offset of the first byte
    pub offset: u64,

    /// Number of bytes, always in `1..=BLOCK_SIZE`
    pub len: usize,

    pub kind: SpanKind,
}

impl BlockSpan {
    /// Index of the containing block
    pub fn block_number(&self) -> u64 {
        block_number(self.offset)
    }

    /// Offset of the first byte within the containing block
    pub fn offset_in_block(&self) -> usize {
        (self.offset - block_start(self.offset)) as usize
    }

    /// Absolute offset one past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.len as u64
    }

    pub fn is_full(&self) -> bool {
        matches!(self.kind, SpanKind::Full)
    }

    /// Position of this span inside a caller buffer that starts at `base`
    pub fn buffer_range(&self, base: u64) -> std::ops::Range<usize> {
        let start = (self.offset - base) as usize;
        start..start + self.len
    }
}

/// Iterator over the spans of `[start, end)`
#[derive(Debug, Clone)]
pub struct BlockSpans {
    cursor: u64,
    end: u64,
}

impl BlockSpans {
    pub fn new(start: u64, end: u64) -> Self {
        Self { cursor: start, end }
    }
}

impl Iterator for BlockSpans {
    type Item = BlockSpan;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }

        let block_first = block_start(self.cursor);
        let block_next = block_first.saturating_add(BLOCK_SIZE as u64);
        let right = self.end.min(block_next);

        let len = (right - self.cursor) as usize;
        let first = (self.cursor - block_first) as usize;
        let kind = if len == BLOCK_SIZE {
            SpanKind::Full
        } else {
            SpanKind::Partial {
                first,
                last: first + len - 1,
            }
        };

        let span = BlockSpan {
            offset: self.cursor,
            len,
            kind,
        };
        self.cursor = right;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.cursor >= self.end {
            return (0, Some(0));
        }
        let blocks = block_number(self.end - 1) - block_number(self.cursor) + 1;
        let blocks = blocks as usize;
        (blocks, Some(blocks))
    }
}

impl ExactSizeIterator for BlockSpans {}

/// Split `[start, end)` into ordered, gap-free block spans
///
/// Returns an empty vector when `end <= start`.
pub fn split_range(start: u64, end: u64) -> Vec<BlockSpan> {
    BlockSpans::new(start, end).collect()
}
