//! Pipeline Tests

#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use blockvfs::error::VfsError;
use blockvfs::memstore::MemStore;
use blockvfs::pipeline::{self, Pipeline};
use blockvfs::protocol::{Command, Reply};

use common::{FaultyConnection, RecordingConnection};

fn get(key: &str) -> Command {
    Command::Get {
        key: key.to_string(),
    }
}

fn set(key: &str, value: &'static [u8]) -> Command {
    Command::Set {
        key: key.to_string(),
        value: Bytes::from_static(value),
    }
}

// =============================================================================
// Queue / Drain Tests
// =============================================================================

#[test]
fn test_handles_are_submission_order() {
    let store = MemStore::new();
    let mut conn = store.connection();
    let mut pipe = Pipeline::new(&mut conn);

    assert_eq!(pipe.queue(&get("a")).unwrap(), 0);
    assert_eq!(pipe.queue(&get("b")).unwrap(), 1);
    assert_eq!(pipe.queue(&get("c")).unwrap(), 2);
    assert_eq!(pipe.pending(), 3);
}

#[test]
fn test_drain_returns_replies_in_order() {
    let store = MemStore::new();
    store.execute(&set("a", b"1"));
    store.execute(&set("c", b"3"));

    let mut conn = store.connection();
    let mut pipe = Pipeline::new(&mut conn);
    for key in ["a", "b", "c"] {
        pipe.queue(&get(key)).unwrap();
    }

    let first = pipe.drain(1).unwrap();
    let rest = pipe.drain(2).unwrap();

    assert_eq!(first, vec![Reply::Data(Bytes::from_static(b"1"))]);
    assert_eq!(rest, vec![Reply::Nil, Reply::Data(Bytes::from_static(b"3"))]);
    assert_eq!(pipe.pending(), 0);
}

#[test]
fn test_drain_more_than_pending_is_rejected() {
    let store = MemStore::new();
    let mut conn = store.connection();
    let mut pipe = Pipeline::new(&mut conn);
    pipe.queue(&get("a")).unwrap();

    let result = pipe.drain(2);

    assert!(matches!(result, Err(VfsError::Protocol(_))));
    // Nothing was consumed
    assert_eq!(pipe.pending(), 1);
    assert_eq!(pipe.drain_all().unwrap(), vec![Reply::Nil]);
}

#[test]
fn test_drain_zero_is_empty() {
    let store = MemStore::new();
    let mut conn = store.connection();
    let mut pipe = Pipeline::new(&mut conn);

    assert!(pipe.drain(0).unwrap().is_empty());
}

#[test]
fn test_one_round_trip_batch() {
    let store = MemStore::new();
    let (mut conn, log) = RecordingConnection::new(&store);

    let replies = pipeline::execute(&mut conn, &[set("a", b"1"), get("a"), get("b")]).unwrap();

    assert_eq!(replies.len(), 3);
    assert!(replies[0].is_ok());
    assert_eq!(log.borrow().sent.len(), 3);
    assert_eq!(log.borrow().received, 3);
}

#[test]
fn test_synchronous() {
    let store = MemStore::new();
    let mut conn = store.connection();

    let reply = pipeline::synchronous(&mut conn, &Command::Ping).unwrap();

    assert_eq!(reply, Reply::Status("PONG".to_string()));
    assert_eq!(conn.pending_replies(), 0);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_queue_failure_stops_batch() {
    let store = MemStore::new();
    let mut conn = FaultyConnection::new(&store).fail_send_at(1);

    let result = pipeline::execute(&mut conn, &[set("a", b"1"), set("b", b"2"), set("c", b"3")]);

    assert!(matches!(result, Err(VfsError::Connection(_))));
    assert!(store.contains_key("a"));
    assert!(!store.contains_key("b"));
    assert!(!store.contains_key("c"));
}

#[test]
fn test_drain_failure_surfaces() {
    let store = MemStore::new();
    let mut conn = FaultyConnection::new(&store).fail_recv_at(1);

    let result = pipeline::execute(&mut conn, &[get("a"), get("b")]);

    match result {
        Err(e) => assert!(e.is_connection_fault()),
        Ok(replies) => panic!("Expected failure, got {:?}", replies),
    }
}
