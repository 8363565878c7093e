//! Range splitting tests

use blockvfs::keys::BLOCK_SIZE;
use blockvfs::range::{split_range, BlockSpan, BlockSpans, SpanKind};

const B: u64 = BLOCK_SIZE as u64;

/// Interesting offsets around the first few block boundaries
fn boundary_offsets() -> Vec<u64> {
    let mut offsets = Vec::new();
    for block in 0..4 {
        for delta in [0, 1, 2, 511, 1022, 1023] {
            offsets.push(block * B + delta);
        }
    }
    offsets
}

fn check_spans(start: u64, end: u64, spans: &[BlockSpan]) {
    // Coverage and contiguity
    let mut cursor = start;
    for span in spans {
        assert_eq!(span.offset, cursor, "gap or overlap in [{}, {})", start, end);
        assert!(span.len >= 1 && span.len <= BLOCK_SIZE);
        cursor = span.end();
    }
    assert_eq!(cursor, end);

    // Each span stays inside one block
    for span in spans {
        assert_eq!(span.offset / B, (span.end() - 1) / B);
    }

    // Lengths add up
    let total: usize = spans.iter().map(|s| s.len).sum();
    assert_eq!(total as u64, end - start);

    // Full exactly when aligned and block-sized
    for span in spans {
        let aligned = span.offset % B == 0 && span.len == BLOCK_SIZE;
        assert_eq!(span.is_full(), aligned);
        if let SpanKind::Partial { first, last } = span.kind {
            assert_eq!(first, span.offset_in_block());
            assert_eq!(last - first + 1, span.len);
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_split_properties_over_boundaries() {
    let offsets = boundary_offsets();

    for &start in &offsets {
        for &end in &offsets {
            let spans = split_range(start, end);
            if end <= start {
                assert!(spans.is_empty());
            } else {
                check_spans(start, end, &spans);
            }
        }
    }
}

#[test]
fn test_span_count_matches_blocks_touched() {
    for (start, end) in [(0, 1), (0, B), (1, B + 1), (500, 2000), (0, 10 * B), (7, 10 * B - 7)] {
        let expected = ((end - 1) / B - start / B + 1) as usize;
        let spans = BlockSpans::new(start, end);

        assert_eq!(spans.len(), expected);
        assert_eq!(spans.count(), expected);
    }
}

#[test]
fn test_single_block_range_yields_one_span() {
    for (start, end) in [(0, 1), (10, 20), (1023, 1024), (1024, 2048), (3000, 3071)] {
        assert_eq!(split_range(start, end).len(), 1, "[{}, {})", start, end);
    }
}

// =============================================================================
// Concrete Cases
// =============================================================================

#[test]
fn test_split_empty_range() {
    assert!(split_range(100, 100).is_empty());
    assert!(split_range(200, 100).is_empty());
}

#[test]
fn test_split_aligned_blocks_are_full() {
    let spans = split_range(B, 4 * B);

    assert_eq!(spans.len(), 3);
    assert!(spans.iter().all(|s| s.kind == SpanKind::Full));
    assert_eq!(
        spans.iter().map(|s| s.block_number()).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn test_split_straddling_write() {
    // 1500 bytes at offset 500
    let spans = split_range(500, 2000);

    assert_eq!(
        spans,
        vec![
            BlockSpan {
                offset: 500,
                len: 524,
                kind: SpanKind::Partial {
                    first: 500,
                    last: 1023
                },
            },
            BlockSpan {
                offset: 1024,
                len: 976,
                kind: SpanKind::Partial {
                    first: 0,
                    last: 975
                },
            },
        ]
    );
}

#[test]
fn test_split_partial_full_partial() {
    let spans = split_range(1000, 3 * B + 10);

    assert_eq!(spans.len(), 4);
    assert_eq!(spans[0].kind, SpanKind::Partial { first: 1000, last: 1023 });
    assert_eq!(spans[1].kind, SpanKind::Full);
    assert_eq!(spans[2].kind, SpanKind::Full);
    assert_eq!(spans[3].kind, SpanKind::Partial { first: 0, last: 9 });
}

#[test]
fn test_buffer_range_relative_to_base() {
    let spans = split_range(500, 2000);

    assert_eq!(spans[0].buffer_range(500), 0..524);
    assert_eq!(spans[1].buffer_range(500), 524..1500);
}

#[test]
fn test_split_near_end_of_address_space() {
    let start = u64::MAX - 10;
    let spans = split_range(start, u64::MAX);

    check_spans(start, u64::MAX, &spans);
}
