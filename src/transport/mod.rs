//! The contract between the typed client and the connection pool.
//!
//! A [`Transport`] executes opaque [`Request`]s against the store and answers
//! with raw bytes. Everything above this module (codecs, batching, cursors) is
//! independent of how the bytes travel; everything below it (wire encoding,
//! host selection, retries) is the transport's business.
//!
//! Two implementations ship with the crate:
//!
//! - `ScyllaTransport` (feature `scylla`) talks CQL to a Cassandra or ScyllaDB cluster.
//! - [`MemoryTransport`] keeps an ordered store in process memory. It counts the
//!   requests it serves and can be told to fail, which makes it the backbone of
//!   the test-suite.

// region:    --- Modules

pub mod memory;

pub use memory::MemoryTransport;

// endregion: --- Modules

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{crud::ConsistencyLevel, error::TransportError};

pub type TransportResult<T> = core::result::Result<T, TransportError>;

/// An encoded column as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp: i64,
    pub ttl: Option<u32>,
}

/// An encoded row key with its columns in store order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub key: Vec<u8>,
    pub columns: Vec<RawColumn>,
}

/// Which columns of a row a read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    All,
    Names(Vec<Vec<u8>>),
}

/// A single write, already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert {
        key: Vec<u8>,
        column: RawColumn,
    },
    RemoveColumn {
        key: Vec<u8>,
        name: Vec<u8>,
        timestamp: i64,
    },
    RemoveColumns {
        key: Vec<u8>,
        names: Vec<Vec<u8>>,
        timestamp: i64,
    },
    RemoveRow {
        key: Vec<u8>,
        timestamp: i64,
    },
}

impl Mutation {
    pub fn key(&self) -> &[u8] {
        match self {
            Mutation::Insert { key, .. }
            | Mutation::RemoveColumn { key, .. }
            | Mutation::RemoveColumns { key, .. }
            | Mutation::RemoveRow { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Columns of one row. Answered with [`Response::Columns`].
    Get {
        key: Vec<u8>,
        columns: ColumnSelection,
    },
    /// Columns of several rows in one round trip. Answered with [`Response::Rows`];
    /// keys without matching columns may be left out.
    MultiGet {
        keys: Vec<Vec<u8>>,
        columns: ColumnSelection,
    },
    /// Mutations applied per key group, in order within each group. Answered
    /// with [`Response::Applied`].
    Mutate { mutations: Vec<Mutation> },
    /// Up to `count` non-empty rows whose keys sort strictly after `start_after`,
    /// in store order. Answered with [`Response::Rows`].
    RowPage {
        start_after: Option<Vec<u8>>,
        count: usize,
    },
    /// Up to `count` columns of one row whose names sort strictly after
    /// `start_after`. Answered with [`Response::Columns`].
    ColumnPage {
        key: Vec<u8>,
        start_after: Option<Vec<u8>>,
        count: usize,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get { .. } => "get",
            Operation::MultiGet { .. } => "multiget",
            Operation::Mutate { .. } => "mutate",
            Operation::RowPage { .. } => "row_page",
            Operation::ColumnPage { .. } => "column_page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub family: String,
    pub consistency: ConsistencyLevel,
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Columns(Vec<RawColumn>),
    Rows(Vec<RawRow>),
    Applied,
}

impl Response {
    pub fn into_columns(self) -> crate::Result<Vec<RawColumn>> {
        match self {
            Response::Columns(columns) => Ok(columns),
            _ => Err(crate::Error::UnexpectedResponse {
                expected: "columns",
            }),
        }
    }

    pub fn into_rows(self) -> crate::Result<Vec<RawRow>> {
        match self {
            Response::Rows(rows) => Ok(rows),
            _ => Err(crate::Error::UnexpectedResponse { expected: "rows" }),
        }
    }

    pub fn into_applied(self) -> crate::Result<()> {
        match self {
            Response::Applied => Ok(()),
            _ => Err(crate::Error::UnexpectedResponse {
                expected: "applied",
            }),
        }
    }
}

/// A connection pool able to execute requests against one keyspace.
///
/// Implementations are shared by every column family of a keyspace and must
/// tolerate concurrent calls. Dropping the future returned by
/// [`Transport::execute`] cancels the request.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Validates connectivity and binds the transport to `keyspace`.
    async fn open(&self, keyspace: &str) -> TransportResult<()>;

    /// Creates the storage backing `family` if it does not exist yet.
    async fn ensure_family(&self, family: &str) -> TransportResult<()>;

    async fn execute(&self, request: Request) -> TransportResult<Response>;

    /// Hosts currently known to back the keyspace, as `host:port`.
    fn hosts(&self) -> Vec<String>;

    /// Releases pooled connections.
    async fn close(&self);
}
