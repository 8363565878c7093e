//! MemStore implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Result, VfsError};
use crate::network::{ConnectionFactory, KvConnection};
use crate::protocol::{Command, Reply};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// A stored value
#[derive(Debug, Clone)]
enum Entry {
    Str(Vec<u8>),
    ZSet(SortedSet),
}

/// Members ordered by (score, member), like a Redis sorted set
#[derive(Debug, Clone, Default)]
struct SortedSet {
    scores: HashMap<String, i64>,
    ordered: BTreeSet<(i64, String)>,
}

impl SortedSet {
    /// Insert or rescore a member; returns true if the member is new
    fn add(&mut self, score: i64, member: &str) -> bool {
        match self.scores.insert(member.to_string(), score) {
            Some(old) => {
                self.ordered.remove(&(old, member.to_string()));
                self.ordered.insert((score, member.to_string()));
                false
            }
            None => {
                self.ordered.insert((score, member.to_string()));
                true
            }
        }
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Remove members with ascending rank in `start..=stop`
    fn remove_by_rank(&mut self, start: i64, stop: i64) -> usize {
        let Some((start, stop)) = normalize_ranks(start, stop, self.len()) else {
            return 0;
        };

        let doomed: Vec<(i64, String)> = self
            .ordered
            .iter()
            .skip(start)
            .take(stop - start + 1)
            .cloned()
            .collect();

        for (score, member) in &doomed {
            self.ordered.remove(&(*score, member.clone()));
            self.scores.remove(member);
        }
        doomed.len()
    }

    /// Members with descending rank in `start..=stop`
    fn rev_range(&self, start: i64, stop: i64) -> Vec<String> {
        let Some((start, stop)) = normalize_ranks(start, stop, self.len()) else {
            return Vec::new();
        };

        self.ordered
            .iter()
            .rev()
            .skip(start)
            .take(stop - start + 1)
            .map(|(_, member)| member.clone())
            .collect()
    }
}

/// Resolve negative ranks and clamp to the set, Redis style
fn normalize_ranks(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { start + len } else { start };
    let mut stop = if stop < 0 { stop + len } else { stop };
    if start < 0 {
        start = 0;
    }
    if start > stop || start >= len {
        return None;
    }
    if stop >= len {
        stop = len - 1;
    }
    Some((start as usize, stop as usize))
}

/// Resolve GETRANGE bounds against a value length, Redis style
fn string_range(first: i64, last: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }
    let mut first = if first < 0 { first + len } else { first };
    let mut last = if last < 0 { last + len } else { last };
    first = first.max(0);
    last = last.max(0);
    if last >= len {
        last = len - 1;
    }
    if first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

/// Shared in-process store
///
/// ## Concurrency:
/// - `data`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - Cloning is cheap; every clone refers to the same data
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection to this store
    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection::new(self.clone())
    }

    /// Execute a single command
    pub fn execute(&self, command: &Command) -> Reply {
        if is_read_only(command) {
            let data = self.data.read();
            return apply_read(&data, command);
        }
        let mut data = self.data.write();
        apply(&mut data, command)
    }

    /// Execute a batch of commands with no other command interleaved
    pub fn execute_atomic(&self, commands: &[Command]) -> Vec<Reply> {
        let mut data = self.data.write();
        commands.iter().map(|cmd| apply(&mut data, cmd)).collect()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Raw string value stored under `key`
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        match self.data.read().get(key) {
            Some(Entry::Str(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Members of the sorted set under `key`, ascending by score
    pub fn sorted_members(&self, key: &str) -> Vec<(String, i64)> {
        match self.data.read().get(key) {
            Some(Entry::ZSet(set)) => set
                .ordered
                .iter()
                .map(|(score, member)| (member.clone(), *score))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Get key count
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }

    /// Remove every key
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl ConnectionFactory for MemStore {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<Self::Connection> {
        Ok(self.connection())
    }
}

fn is_read_only(command: &Command) -> bool {
    matches!(
        command,
        Command::Get { .. }
            | Command::GetRange { .. }
            | Command::Exists { .. }
            | Command::ZRevRange { .. }
            | Command::Ping
    )
}

fn apply_read(data: &HashMap<String, Entry>, command: &Command) -> Reply {
    match command {
        Command::Get { key } => match data.get(key) {
            Some(Entry::Str(value)) => Reply::Data(Bytes::copy_from_slice(value)),
            Some(Entry::ZSet(_)) => Reply::error(WRONGTYPE),
            None => Reply::Nil,
        },
        Command::GetRange { key, first, last } => match data.get(key) {
            Some(Entry::Str(value)) => match string_range(*first, *last, value.len()) {
                Some((first, last)) => Reply::Data(Bytes::copy_from_slice(&value[first..=last])),
                None => Reply::Data(Bytes::new()),
            },
            Some(Entry::ZSet(_)) => Reply::error(WRONGTYPE),
            None => Reply::Data(Bytes::new()),
        },
        Command::Exists { key } => Reply::Int(i64::from(data.contains_key(key))),
        Command::ZRevRange { key, start, stop } => match data.get(key) {
            Some(Entry::ZSet(set)) => Reply::Array(
                set.rev_range(*start, *stop)
                    .into_iter()
                    .map(|member| Reply::Data(Bytes::from(member.into_bytes())))
                    .collect(),
            ),
            Some(Entry::Str(_)) => Reply::error(WRONGTYPE),
            None => Reply::Array(Vec::new()),
        },
        Command::Ping => Reply::Status("PONG".to_string()),
        other => Reply::error(format!(
            "ERR {} is not a read command",
            other.command_type().name()
        )),
    }
}

fn apply(data: &mut HashMap<String, Entry>, command: &Command) -> Reply {
    match command {
        Command::Set { key, value } => {
            data.insert(key.clone(), Entry::Str(value.to_vec()));
            Reply::ok()
        }
        Command::SetRange { key, offset, value } => {
            let offset = *offset as usize;
            match data.get(key) {
                Some(Entry::ZSet(_)) => return Reply::error(WRONGTYPE),
                Some(Entry::Str(existing)) if value.is_empty() => {
                    return Reply::Int(existing.len() as i64)
                }
                None if value.is_empty() => return Reply::Int(0),
                _ => {}
            }
            let Entry::Str(existing) = data
                .entry(key.clone())
                .or_insert_with(|| Entry::Str(Vec::new()))
            else {
                return Reply::error(WRONGTYPE);
            };
            let end = offset + value.len();
            if existing.len() < end {
                existing.resize(end, 0);
            }
            existing[offset..end].copy_from_slice(value);
            Reply::Int(existing.len() as i64)
        }
        Command::Del { key } => Reply::Int(i64::from(data.remove(key).is_some())),
        Command::ZAdd { key, score, member } => {
            let entry = data
                .entry(key.clone())
                .or_insert_with(|| Entry::ZSet(SortedSet::default()));
            match entry {
                Entry::ZSet(set) => Reply::Int(i64::from(set.add(*score, member))),
                Entry::Str(_) => Reply::error(WRONGTYPE),
            }
        }
        Command::ZRemRangeByRank { key, start, stop } => {
            let (removed, now_empty) = match data.get_mut(key) {
                Some(Entry::ZSet(set)) => {
                    let removed = set.remove_by_rank(*start, *stop);
                    (removed, set.len() == 0)
                }
                Some(Entry::Str(_)) => return Reply::error(WRONGTYPE),
                None => return Reply::Int(0),
            };
            if now_empty {
                data.remove(key);
            }
            Reply::Int(removed as i64)
        }
        Command::Multi | Command::Exec => Reply::error(format!(
            "ERR {} is only valid on a connection",
            command.command_type().name()
        )),
        read => apply_read(data, read),
    }
}

/// One connection to a [`MemStore`]
///
/// Replies are buffered in submission order. Commands sent between MULTI and
/// EXEC are held back (replying `QUEUED`) and applied atomically at EXEC.
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemStore,
    replies: VecDeque<Reply>,
    transaction: Option<Vec<Command>>,
}

impl MemoryConnection {
    pub fn new(store: MemStore) -> Self {
        Self {
            store,
            replies: VecDeque::new(),
            transaction: None,
        }
    }

    /// Number of replies sent but not yet received
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }
}

impl KvConnection for MemoryConnection {
    fn send(&mut self, command: &Command) -> Result<()> {
        let in_transaction = self.transaction.is_some();
        let reply = match command {
            Command::Multi if in_transaction => Reply::error("ERR MULTI calls can not be nested"),
            Command::Multi => {
                self.transaction = Some(Vec::new());
                Reply::ok()
            }
            Command::Exec => match self.transaction.take() {
                Some(queued) => Reply::Array(self.store.execute_atomic(&queued)),
                None => Reply::error("ERR EXEC without MULTI"),
            },
            cmd => match self.transaction.as_mut() {
                Some(queued) => {
                    queued.push(cmd.clone());
                    Reply::queued()
                }
                None => self.store.execute(cmd),
            },
        };
        self.replies.push_back(reply);
        Ok(())
    }

    fn recv(&mut self) -> Result<Reply> {
        self.replies
            .pop_front()
            .ok_or_else(|| VfsError::Protocol("no reply pending".to_string()))
    }
}
