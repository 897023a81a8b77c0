use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use scylla::{
    client::caching_session::CachingSession,
    deserialize::row::DeserializeRow,
    response::query_result::QueryResult,
    serialize::row::SerializeRow,
    statement::{
        batch::{Batch, BatchType},
        unprepared::Statement,
    },
    value::CqlValue,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::ConnectionParams;
use crate::{
    crud::ConsistencyLevel,
    error::TransportError,
    transport::{
        ColumnSelection, Mutation, Operation, RawColumn, RawRow, Request, Response, Transport,
        TransportResult,
    },
};

const COLUMNS: &str = "column1, value, writetime(value), ttl(value)";

type ColumnTuple = (Vec<u8>, Vec<u8>, i64, Option<i32>);
type KeyedColumnTuple = (Vec<u8>, Vec<u8>, Vec<u8>, i64, Option<i32>);

// region:    --- CQL

fn select_columns(family: &str, selection: &ColumnSelection) -> String {
    match selection {
        ColumnSelection::All => format!(r#"SELECT {COLUMNS} FROM "{family}" WHERE key = ?"#),
        ColumnSelection::Names(_) => {
            format!(r#"SELECT {COLUMNS} FROM "{family}" WHERE key = ? AND column1 IN ?"#)
        }
    }
}

fn select_multiget(family: &str, selection: &ColumnSelection) -> String {
    match selection {
        ColumnSelection::All => format!(r#"SELECT key, {COLUMNS} FROM "{family}" WHERE key IN ?"#),
        ColumnSelection::Names(_) => format!(
            r#"SELECT key, {COLUMNS} FROM "{family}" WHERE key IN ? AND column1 IN ?"#
        ),
    }
}

fn select_column_page(family: &str, resume: bool) -> String {
    if resume {
        format!(r#"SELECT {COLUMNS} FROM "{family}" WHERE key = ? AND column1 > ? LIMIT ?"#)
    } else {
        format!(r#"SELECT {COLUMNS} FROM "{family}" WHERE key = ? LIMIT ?"#)
    }
}

fn select_row_keys(family: &str, resume: bool) -> String {
    if resume {
        format!(r#"SELECT DISTINCT key FROM "{family}" WHERE token(key) > token(?) LIMIT ?"#)
    } else {
        format!(r#"SELECT DISTINCT key FROM "{family}" LIMIT ?"#)
    }
}

fn insert_column(family: &str) -> String {
    format!(
        r#"INSERT INTO "{family}" (key, column1, value) VALUES (?, ?, ?) USING TIMESTAMP ? AND TTL ?"#
    )
}

fn delete_column(family: &str) -> String {
    format!(r#"DELETE FROM "{family}" USING TIMESTAMP ? WHERE key = ? AND column1 = ?"#)
}

fn delete_row(family: &str) -> String {
    format!(r#"DELETE FROM "{family}" USING TIMESTAMP ? WHERE key = ?"#)
}

fn create_family(family: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS "{family}" (key blob, column1 blob, value blob, PRIMARY KEY (key, column1))"#
    )
}

fn create_keyspace(name: &str, replication_factor: u32) -> String {
    format!("CREATE KEYSPACE IF NOT EXISTS {name} WITH REPLICATION = {{ 'class' : 'SimpleStrategy', 'replication_factor' : {replication_factor} }};")
}

// endregion: --- CQL

fn limit(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn rows_of<R>(result: QueryResult) -> TransportResult<Vec<R>>
where
    R: for<'frame, 'metadata> DeserializeRow<'frame, 'metadata>,
{
    let rows = result
        .into_rows_result()?
        .rows::<R>()?
        .collect::<Result<Vec<R>, _>>()?;

    Ok(rows)
}

fn raw_column((name, value, timestamp, ttl): ColumnTuple) -> RawColumn {
    RawColumn {
        name,
        value,
        timestamp,
        ttl: ttl.and_then(|ttl| u32::try_from(ttl).ok()),
    }
}

/// Groups `(key, column...)` tuples, which the store returns partition by partition.
fn group_rows(tuples: Vec<KeyedColumnTuple>) -> Vec<RawRow> {
    let mut rows: Vec<RawRow> = Vec::new();

    for (key, name, value, timestamp, ttl) in tuples {
        let column = raw_column((name, value, timestamp, ttl));

        match rows.last_mut() {
            Some(row) if row.key == key => row.columns.push(column),
            _ => rows.push(RawRow {
                key,
                columns: vec![column],
            }),
        }
    }

    rows
}

/// A [`Transport`] executing requests over a ScyllaDB / Cassandra `CachingSession`.
///
/// Closing the transport drops its session. Requests issued afterwards fail.
pub struct ScyllaTransport {
    session: RwLock<Option<Arc<CachingSession>>>,
    params: ConnectionParams,
}

impl std::fmt::Debug for ScyllaTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaTransport")
            .field("hosts", &self.hosts())
            .field("params", &self.params)
            .finish()
    }
}

// Constructors
impl ScyllaTransport {
    pub fn from_session(session: Arc<CachingSession>, params: ConnectionParams) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            params,
        }
    }

    pub async fn connect(seeds: &[String], params: ConnectionParams) -> TransportResult<Self> {
        debug!("Connecting to {:?}", seeds);

        let session = params.caching(seeds).await?;

        Ok(Self::from_session(Arc::new(session), params))
    }

    /// The underlying session, `None` once the transport is closed.
    pub async fn session(&self) -> Option<Arc<CachingSession>> {
        self.session.read().await.clone()
    }

    async fn open_session(&self) -> TransportResult<Arc<CachingSession>> {
        self.session()
            .await
            .ok_or_else(|| "session is closed".into())
    }
}

// Queries
impl ScyllaTransport {
    async fn query<V>(
        &self,
        cql: String,
        consistency: ConsistencyLevel,
        values: V,
    ) -> TransportResult<QueryResult>
    where
        V: SerializeRow + Send + Sync,
    {
        debug!("Executing query: {}", cql);

        let mut statement = Statement::new(cql);
        statement.set_consistency(consistency.into());

        let session = self.open_session().await?;

        Ok(session.execute_unpaged(statement, values).await?)
    }

    async fn columns(
        &self,
        family: &str,
        key: Vec<u8>,
        selection: &ColumnSelection,
        consistency: ConsistencyLevel,
    ) -> TransportResult<Vec<RawColumn>> {
        let cql = select_columns(family, selection);

        let result = match selection {
            ColumnSelection::All => self.query(cql, consistency, (key,)).await?,
            ColumnSelection::Names(names) => self.query(cql, consistency, (key, names)).await?,
        };

        Ok(rows_of::<ColumnTuple>(result)?
            .into_iter()
            .map(raw_column)
            .collect())
    }

    async fn multiget(
        &self,
        family: &str,
        keys: Vec<Vec<u8>>,
        selection: &ColumnSelection,
        consistency: ConsistencyLevel,
    ) -> TransportResult<Vec<RawRow>> {
        let cql = select_multiget(family, selection);

        let result = match selection {
            ColumnSelection::All => self.query(cql, consistency, (keys,)).await?,
            ColumnSelection::Names(names) => self.query(cql, consistency, (keys, names)).await?,
        };

        Ok(group_rows(rows_of::<KeyedColumnTuple>(result)?))
    }

    async fn row_page(
        &self,
        family: &str,
        start_after: Option<Vec<u8>>,
        count: usize,
        consistency: ConsistencyLevel,
    ) -> TransportResult<Vec<RawRow>> {
        let cql = select_row_keys(family, start_after.is_some());

        let result = match start_after {
            Some(start) => self.query(cql, consistency, (start, limit(count))).await?,
            None => self.query(cql, consistency, (limit(count),)).await?,
        };
        let keys = rows_of::<(Vec<u8>,)>(result)?;

        try_join_all(keys.into_iter().map(|(key,)| async move {
            let columns = self
                .columns(family, key.clone(), &ColumnSelection::All, consistency)
                .await?;

            Ok::<_, TransportError>(RawRow { key, columns })
        }))
        .await
    }

    async fn column_page(
        &self,
        family: &str,
        key: Vec<u8>,
        start_after: Option<Vec<u8>>,
        count: usize,
        consistency: ConsistencyLevel,
    ) -> TransportResult<Vec<RawColumn>> {
        let cql = select_column_page(family, start_after.is_some());

        let result = match start_after {
            Some(start) => {
                self.query(cql, consistency, (key, start, limit(count)))
                    .await?
            }
            None => self.query(cql, consistency, (key, limit(count))).await?,
        };

        Ok(rows_of::<ColumnTuple>(result)?
            .into_iter()
            .map(raw_column)
            .collect())
    }

    async fn mutate(
        &self,
        family: &str,
        mutations: Vec<Mutation>,
        consistency: ConsistencyLevel,
    ) -> TransportResult<()> {
        // Unlogged: the store applies each partition atomically, nothing across partitions.
        let mut batch = Batch::new(BatchType::Unlogged);
        let mut values: Vec<Vec<CqlValue>> = Vec::with_capacity(mutations.len());

        let mut push = |cql: String, row: Vec<CqlValue>| {
            batch.append_statement(Statement::new(cql));
            values.push(row);
        };

        for mutation in mutations {
            match mutation {
                Mutation::Insert { key, column } => push(
                    insert_column(family),
                    vec![
                        CqlValue::Blob(key),
                        CqlValue::Blob(column.name),
                        CqlValue::Blob(column.value),
                        CqlValue::BigInt(column.timestamp),
                        CqlValue::Int(column.ttl.map_or(0, |ttl| limit(ttl as usize))),
                    ],
                ),
                Mutation::RemoveColumn {
                    key,
                    name,
                    timestamp,
                } => push(
                    delete_column(family),
                    vec![
                        CqlValue::BigInt(timestamp),
                        CqlValue::Blob(key),
                        CqlValue::Blob(name),
                    ],
                ),
                Mutation::RemoveColumns {
                    key,
                    names,
                    timestamp,
                } => {
                    for name in names {
                        push(
                            delete_column(family),
                            vec![
                                CqlValue::BigInt(timestamp),
                                CqlValue::Blob(key.clone()),
                                CqlValue::Blob(name),
                            ],
                        );
                    }
                }
                Mutation::RemoveRow { key, timestamp } => push(
                    delete_row(family),
                    vec![CqlValue::BigInt(timestamp), CqlValue::Blob(key)],
                ),
            }
        }

        debug!(
            "Executing batch of {} statements on {}",
            values.len(),
            family
        );

        batch.set_consistency(consistency.into());
        self.open_session().await?.batch(&batch, values).await?;

        Ok(())
    }
}

#[async_trait]
impl Transport for ScyllaTransport {
    async fn open(&self, keyspace: &str) -> TransportResult<()> {
        if self.params.create_keyspace {
            let cql = create_keyspace(keyspace, self.params.replication_factor);
            self.query(cql, ConsistencyLevel::All, ()).await?;
        }

        self.open_session()
            .await?
            .get_session()
            .use_keyspace(keyspace, self.params.keyspace_case_sensitive)
            .await?;

        Ok(())
    }

    async fn ensure_family(&self, family: &str) -> TransportResult<()> {
        self.query(create_family(family), ConsistencyLevel::All, ())
            .await?;

        Ok(())
    }

    async fn execute(&self, request: Request) -> TransportResult<Response> {
        let Request {
            family,
            consistency,
            operation,
        } = request;

        let response = match operation {
            Operation::Get { key, columns } => {
                Response::Columns(self.columns(&family, key, &columns, consistency).await?)
            }
            Operation::MultiGet { keys, columns } => {
                Response::Rows(self.multiget(&family, keys, &columns, consistency).await?)
            }
            Operation::Mutate { mutations } => {
                self.mutate(&family, mutations, consistency).await?;
                Response::Applied
            }
            Operation::RowPage { start_after, count } => Response::Rows(
                self.row_page(&family, start_after, count, consistency)
                    .await?,
            ),
            Operation::ColumnPage {
                key,
                start_after,
                count,
            } => Response::Columns(
                self.column_page(&family, key, start_after, count, consistency)
                    .await?,
            ),
        };

        Ok(response)
    }

    fn hosts(&self) -> Vec<String> {
        // The slot is only write-locked while closing.
        let Ok(slot) = self.session.try_read() else {
            return Vec::new();
        };
        let Some(session) = slot.as_ref() else {
            return Vec::new();
        };

        session
            .get_session()
            .get_cluster_state()
            .get_nodes_info()
            .iter()
            .map(|node| format!("{}:{}", node.address.ip(), node.address.port()))
            .collect()
    }

    async fn close(&self) {
        if let Some(session) = self.session.write().await.take() {
            debug!("Closing session");
            drop(session);
        }
    }
}

// region:    --- Tests


// endregion: --- Tests
