//! In-process transport backed by ordered maps.
//!
//! Rows are ordered by their encoded key and columns by their encoded name,
//! i.e. the store behaves like a cluster using an order-preserving partitioner
//! with a bytes comparator. Writes resolve conflicts by timestamp (last write
//! wins) and removals only delete columns written at or before the removal's
//! timestamp. Tombstones themselves are not retained.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    ops::Bound,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    ColumnSelection, Mutation, Operation, RawColumn, RawRow, Request, Response, Transport,
    TransportResult,
};

type Family = BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, RawColumn>>;

#[derive(Debug, Default)]
struct State {
    keyspace: Option<String>,
    families: HashMap<String, Family>,
    failing_keys: HashSet<Vec<u8>>,
}

/// Number of requests served, per operation.
#[derive(Debug, Default)]
pub struct RequestCounts {
    gets: AtomicUsize,
    multigets: AtomicUsize,
    mutations: AtomicUsize,
    row_pages: AtomicUsize,
    column_pages: AtomicUsize,
}

impl RequestCounts {
    fn record(&self, operation: &Operation) {
        let counter = match operation {
            Operation::Get { .. } => &self.gets,
            Operation::MultiGet { .. } => &self.multigets,
            Operation::Mutate { .. } => &self.mutations,
            Operation::RowPage { .. } => &self.row_pages,
            Operation::ColumnPage { .. } => &self.column_pages,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    pub fn multigets(&self) -> usize {
        self.multigets.load(Ordering::Relaxed)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::Relaxed)
    }

    pub fn row_pages(&self) -> usize {
        self.row_pages.load(Ordering::Relaxed)
    }

    pub fn column_pages(&self) -> usize {
        self.column_pages.load(Ordering::Relaxed)
    }
}

/// A [`Transport`] keeping every column family of one keyspace in memory.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use grapple_cassandra::{codec::Utf8Codec, transport::MemoryTransport, Cluster};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(MemoryTransport::new());
/// let keyspace = Cluster::new(["localhost"])
///     .keyspace("Keyspace1")
///     .connect_with(transport.clone())
///     .await?;
///
/// let cf = keyspace.column_family("Standard1", Utf8Codec, Utf8Codec, Utf8Codec)?;
/// cf.insert(&"key".to_string(), &cf.new_column("name".into(), "Coda".into())).await?;
///
/// assert_eq!(1, transport.requests().mutations());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<State>,
    counts: RequestCounts,
    reachable: bool,
    closed: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

// Constructors
impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            counts: RequestCounts::default(),
            reachable: true,
            closed: AtomicBool::new(false),
        }
    }

    /// A transport whose `open` always fails, as if no seed host answered.
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }
}

// Inspection and failure injection
impl MemoryTransport {
    pub fn requests(&self) -> &RequestCounts {
        &self.counts
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn keyspace(&self) -> Option<String> {
        self.state.lock().await.keyspace.clone()
    }

    /// Makes every mutation group for `key` fail. Groups preceding it in a
    /// batch are still applied, like a partially failed batch on a cluster.
    pub async fn fail_writes_for_key(&self, key: impl Into<Vec<u8>>) {
        self.state.lock().await.failing_keys.insert(key.into());
    }

    pub async fn heal(&self) {
        self.state.lock().await.failing_keys.clear();
    }
}

fn selected(row: &BTreeMap<Vec<u8>, RawColumn>, columns: &ColumnSelection) -> Vec<RawColumn> {
    match columns {
        ColumnSelection::All => row.values().cloned().collect(),
        ColumnSelection::Names(names) => row
            .values()
            .filter(|column| names.contains(&column.name))
            .cloned()
            .collect(),
    }
}

fn after(start: &Option<Vec<u8>>) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    match start {
        Some(start) => (Bound::Excluded(start.clone()), Bound::Unbounded),
        None => (Bound::Unbounded, Bound::Unbounded),
    }
}

fn remove_older(row: &mut BTreeMap<Vec<u8>, RawColumn>, name: &[u8], timestamp: i64) {
    if row.get(name).is_some_and(|c| c.timestamp <= timestamp) {
        row.remove(name);
    }
}

fn apply(family: &mut Family, mutation: Mutation) {
    match mutation {
        Mutation::Insert { key, column } => {
            let row = family.entry(key).or_default();
            let newer = row
                .get(&column.name)
                .map_or(true, |existing| existing.timestamp <= column.timestamp);
            if newer {
                row.insert(column.name.clone(), column);
            }
        }
        Mutation::RemoveColumn {
            key,
            name,
            timestamp,
        } => {
            if let Some(row) = family.get_mut(&key) {
                remove_older(row, &name, timestamp);
            }
        }
        Mutation::RemoveColumns {
            key,
            names,
            timestamp,
        } => {
            if let Some(row) = family.get_mut(&key) {
                for name in &names {
                    remove_older(row, name, timestamp);
                }
            }
        }
        Mutation::RemoveRow { key, timestamp } => {
            if let Some(row) = family.get_mut(&key) {
                row.retain(|_, column| column.timestamp > timestamp);
            }
        }
    }
}

fn group_by_key(mutations: Vec<Mutation>) -> Vec<(Vec<u8>, Vec<Mutation>)> {
    let mut groups: Vec<(Vec<u8>, Vec<Mutation>)> = Vec::new();

    for mutation in mutations {
        match groups
            .iter()
            .position(|(key, _)| key.as_slice() == mutation.key())
        {
            Some(index) => groups[index].1.push(mutation),
            None => groups.push((mutation.key().to_vec(), vec![mutation])),
        }
    }

    groups
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, keyspace: &str) -> TransportResult<()> {
        if !self.reachable {
            return Err("no seed host reachable".into());
        }

        debug!("Opening in-memory keyspace '{}'", keyspace);
        self.state.lock().await.keyspace = Some(keyspace.to_string());
        self.closed.store(false, Ordering::Release);

        Ok(())
    }

    async fn ensure_family(&self, family: &str) -> TransportResult<()> {
        self.state
            .lock()
            .await
            .families
            .entry(family.to_string())
            .or_default();

        Ok(())
    }

    async fn execute(&self, request: Request) -> TransportResult<Response> {
        if self.is_closed() {
            return Err("transport closed".into());
        }

        self.counts.record(&request.operation);

        let mut state = self.state.lock().await;
        let State {
            families,
            failing_keys,
            ..
        } = &mut *state;
        let name = request.family;

        let response = match request.operation {
            Operation::Get { key, columns } => Response::Columns(
                families
                    .get(&name)
                    .and_then(|family| family.get(&key))
                    .map(|row| selected(row, &columns))
                    .unwrap_or_default(),
            ),
            Operation::MultiGet { keys, columns: selection } => {
                let family = families.get(&name);
                Response::Rows(
                    keys.into_iter()
                        .filter_map(|key| {
                            let columns = selected(family?.get(&key)?, &selection);
                            (!columns.is_empty()).then_some(RawRow { key, columns })
                        })
                        .collect(),
                )
            }
            Operation::Mutate { mutations } => {
                let family = families.entry(name).or_default();
                for (key, group) in group_by_key(mutations) {
                    if failing_keys.contains(&key) {
                        return Err(format!("write failed for key {key:?}").into());
                    }
                    for mutation in group {
                        apply(family, mutation);
                    }
                }
                family.retain(|_, row| !row.is_empty());
                Response::Applied
            }
            Operation::RowPage { start_after, count } => Response::Rows(
                families
                    .get(&name)
                    .map(|family| {
                        family
                            .range(after(&start_after))
                            .filter(|(_, row)| !row.is_empty())
                            .take(count)
                            .map(|(key, row)| RawRow {
                                key: key.clone(),
                                columns: row.values().cloned().collect(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            Operation::ColumnPage {
                key,
                start_after,
                count,
            } => Response::Columns(
                families
                    .get(&name)
                    .and_then(|family| family.get(&key))
                    .map(|row| {
                        row.range(after(&start_after))
                            .take(count)
                            .map(|(_, column)| column.clone())
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        };

        Ok(response)
    }

    fn hosts(&self) -> Vec<String> {
        vec!["in-memory".to_string()]
    }

    async fn close(&self) {
        debug!("Closing in-memory transport");
        self.closed.store(true, Ordering::Release);
    }
}

// region:    --- Tests


// endregion: --- Tests
