//! Size Tracker Tests

#[path = "../common/mod.rs"]
mod common;

use blockvfs::error::VfsError;
use blockvfs::keys::FileIdentity;
use blockvfs::memstore::MemStore;
use blockvfs::protocol::{Command, Reply};
use blockvfs::size::SizeTracker;

use common::{FaultyConnection, RecordingConnection};

fn setup_tracker(name: &str) -> (MemStore, SizeTracker) {
    let tracker = SizeTracker::new(&FileIdentity::new(name).unwrap()).unwrap();
    (MemStore::new(), tracker)
}

// =============================================================================
// Growth Tests
// =============================================================================

#[test]
fn test_unsized_file_is_zero() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = store.connection();

    assert_eq!(tracker.key(), "db:filelen");
    assert_eq!(tracker.current_size(&mut conn).unwrap(), 0);
}

#[test]
fn test_increase_to_is_monotonic() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = store.connection();

    tracker.increase_to(&mut conn, 100).unwrap();
    tracker.increase_to(&mut conn, 5000).unwrap();
    tracker.increase_to(&mut conn, 20).unwrap();

    assert_eq!(tracker.current_size(&mut conn).unwrap(), 5000);
}

#[test]
fn test_increase_to_leaves_single_member() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = store.connection();

    for len in [10, 300, 7, 300, 299] {
        tracker.increase_to(&mut conn, len).unwrap();
        assert_eq!(store.sorted_members("db:filelen").len(), 1);
    }

    assert_eq!(
        store.sorted_members("db:filelen"),
        vec![("300".to_string(), 300)]
    );
}

#[test]
fn test_increase_to_is_one_pipelined_pair() {
    let store = MemStore::new();
    let tracker = SizeTracker::new(&FileIdentity::new("db").unwrap()).unwrap();
    let (mut conn, log) = RecordingConnection::new(&store);

    tracker.increase_to(&mut conn, 2000).unwrap();

    let traffic = log.borrow();
    assert_eq!(
        traffic.sent,
        vec![
            Command::ZAdd {
                key: "db:filelen".to_string(),
                score: 2000,
                member: "2000".to_string(),
            },
            Command::ZRemRangeByRank {
                key: "db:filelen".to_string(),
                start: 0,
                stop: -2,
            },
        ]
    );
    assert_eq!(traffic.received, 2);
}

#[test]
fn test_concurrent_increases_keep_maximum() {
    let (store, tracker) = setup_tracker("shared");
    let tracker = &tracker;

    crossbeam::thread::scope(|s| {
        for t in 0..8u64 {
            let store = store.clone();
            s.spawn(move |_| {
                let mut conn = store.connection();
                for i in 0..200u64 {
                    tracker.increase_to(&mut conn, i * 8 + t).unwrap();
                }
            });
        }
    })
    .unwrap();

    let mut conn = store.connection();
    assert_eq!(tracker.current_size(&mut conn).unwrap(), 199 * 8 + 7);
    assert_eq!(store.sorted_members("shared:filelen").len(), 1);
}

// =============================================================================
// Force Set Tests
// =============================================================================

#[test]
fn test_force_set_shrinks() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = store.connection();
    tracker.increase_to(&mut conn, 10_000).unwrap();

    tracker.force_set(&mut conn, 1024).unwrap();

    assert_eq!(tracker.current_size(&mut conn).unwrap(), 1024);
    assert_eq!(conn.pending_replies(), 0);
}

#[test]
fn test_force_set_zero() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = store.connection();
    tracker.increase_to(&mut conn, 42).unwrap();

    tracker.force_set(&mut conn, 0).unwrap();

    assert_eq!(tracker.current_size(&mut conn).unwrap(), 0);
}

#[test]
fn test_force_set_on_unsized_file() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = store.connection();

    tracker.force_set(&mut conn, 77).unwrap();

    assert_eq!(tracker.current_size(&mut conn).unwrap(), 77);
}

#[test]
fn test_force_set_aborted_transaction() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = FaultyConnection::new(&store).replace_reply(4, Reply::Nil);

    let result = tracker.force_set(&mut conn, 10);

    assert!(matches!(result, Err(VfsError::Protocol(_))));
}

// =============================================================================
// Malformed State Tests
// =============================================================================

#[test]
fn test_malformed_member_is_size_unavailable() {
    let (store, tracker) = setup_tracker("db");
    store.execute(&Command::ZAdd {
        key: "db:filelen".to_string(),
        score: 1,
        member: "not-a-number".to_string(),
    });
    let mut conn = store.connection();

    let result = tracker.current_size(&mut conn);

    assert!(matches!(result, Err(VfsError::SizeUnavailable(_))));
}

#[test]
fn test_wrong_type_size_key_is_size_unavailable() {
    let (store, tracker) = setup_tracker("db");
    store.execute(&Command::Set {
        key: "db:filelen".to_string(),
        value: bytes::Bytes::from_static(b"123"),
    });
    let mut conn = store.connection();

    let result = tracker.current_size(&mut conn);

    assert!(matches!(result, Err(VfsError::SizeUnavailable(_))));
}

#[test]
fn test_increase_to_rejects_non_integer_reply() {
    let (store, tracker) = setup_tracker("db");
    let mut conn = FaultyConnection::new(&store).replace_reply(0, Reply::ok());

    let result = tracker.increase_to(&mut conn, 10);

    assert!(matches!(result, Err(VfsError::Protocol(_))));
}
