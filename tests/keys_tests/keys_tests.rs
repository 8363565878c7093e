//! Key derivation tests

use blockvfs::error::VfsError;
use blockvfs::keys::{
    block_key, block_number, block_start, size_key, FileIdentity, BLOCK_SIZE, MAX_IDENTITY_LEN,
    MAX_KEY_LEN,
};

fn id(name: &str) -> FileIdentity {
    FileIdentity::new(name).unwrap()
}

// =============================================================================
// Block Keys
// =============================================================================

#[test]
fn test_block_key_format() {
    let file = id("db");

    assert_eq!(block_key(&file, 0).unwrap(), "db:0");
    assert_eq!(block_key(&file, 1023).unwrap(), "db:0");
    assert_eq!(block_key(&file, 1024).unwrap(), "db:1");
    assert_eq!(block_key(&file, 10 * 1024 + 5).unwrap(), "db:a");
    assert_eq!(block_key(&file, 255 * 1024).unwrap(), "db:ff");
    assert_eq!(block_key(&file, 4096 * 1024).unwrap(), "db:1000");
}

#[test]
fn test_block_key_equal_iff_same_block() {
    let file = id("main.db");
    let offsets: Vec<u64> = (0..6000).step_by(97).chain([1023, 1024, 2047, 2048]).collect();

    for &a in &offsets {
        for &b in &offsets {
            let same_block = a / BLOCK_SIZE as u64 == b / BLOCK_SIZE as u64;
            let same_key = block_key(&file, a).unwrap() == block_key(&file, b).unwrap();
            assert_eq!(same_block, same_key, "offsets {} and {}", a, b);
        }
    }
}

#[test]
fn test_block_key_distinct_identities() {
    let a = id("a.db");
    let b = id("b.db");

    assert_ne!(block_key(&a, 0).unwrap(), block_key(&b, 0).unwrap());
    assert_ne!(size_key(&a).unwrap(), size_key(&b).unwrap());
}

#[test]
fn test_block_key_max_offset() {
    let file = id("db");
    let key = block_key(&file, u64::MAX).unwrap();

    assert_eq!(key, format!("db:{:x}", u64::MAX / BLOCK_SIZE as u64));
}

// =============================================================================
// Size Key
// =============================================================================

#[test]
fn test_size_key_format() {
    assert_eq!(size_key(&id("db")).unwrap(), "db:filelen");
    assert_eq!(size_key(&id("")).unwrap(), ":filelen");
}

// =============================================================================
// Identity Validation
// =============================================================================

#[test]
fn test_identity_at_limit_fits_key_budget() {
    let file = id(&"x".repeat(MAX_IDENTITY_LEN));

    let block = block_key(&file, u64::MAX).unwrap();
    let size = size_key(&file).unwrap();

    assert!(block.len() <= MAX_KEY_LEN);
    assert!(size.len() <= MAX_KEY_LEN);
}

#[test]
fn test_identity_too_long() {
    let result = FileIdentity::new("x".repeat(MAX_IDENTITY_LEN + 1));

    match result {
        Err(VfsError::IdentityTooLong { len, max }) => {
            assert_eq!(len, MAX_IDENTITY_LEN + 1);
            assert_eq!(max, MAX_IDENTITY_LEN);
        }
        other => panic!("Expected IdentityTooLong, got {:?}", other),
    }
}

#[test]
fn test_identity_display() {
    let file = id("data/main.db");

    assert_eq!(file.to_string(), "data/main.db");
    assert_eq!(file.as_str(), "data/main.db");
}

// =============================================================================
// Block Arithmetic
// =============================================================================

#[test]
fn test_block_number_and_start() {
    assert_eq!(block_number(0), 0);
    assert_eq!(block_number(1023), 0);
    assert_eq!(block_number(1024), 1);
    assert_eq!(block_start(1500), 1024);
    assert_eq!(block_start(2048), 2048);
}
