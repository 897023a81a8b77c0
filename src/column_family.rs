//! A typed façade over a single column family.
//!
//! [`ColumnFamily`] encodes keys, column names and values with the codecs it
//! was built with, issues requests through the keyspace transport and decodes
//! the answers. It holds no mutable state and can be cloned freely and shared
//! across tasks.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    hash::Hash,
    sync::Arc,
};

use tracing::debug;

use crate::{
    batch::Batch,
    codec::{self, Codec, CodecError},
    column::{Column, Row},
    crud::{ConsistencyLevel, CrudParams},
    cursor::{ColumnPages, ColumnsCursor, Cursor, RowPages, RowsCursor},
    keyspace::Shared,
    transport::{ColumnSelection, Mutation, Operation, RawColumn, Request, Response},
    Error, Result, TransportError,
};

/// Outcome for one key of a multi-key read.
///
/// A key whose columns fail to decode is reported as `Err` without failing
/// the other keys of the same request.
pub type Fetched<T> = core::result::Result<T, CodecError>;

pub struct ColumnFamily<K, N, V> {
    keyspace: Arc<Shared>,
    name: String,
    key_codec: Arc<dyn Codec<Value = K>>,
    name_codec: Arc<dyn Codec<Value = N>>,
    value_codec: Arc<dyn Codec<Value = V>>,
    params: CrudParams,
}

impl<K, N, V> Clone for ColumnFamily<K, N, V> {
    fn clone(&self) -> Self {
        Self {
            keyspace: self.keyspace.clone(),
            name: self.name.clone(),
            key_codec: self.key_codec.clone(),
            name_codec: self.name_codec.clone(),
            value_codec: self.value_codec.clone(),
            params: self.params.clone(),
        }
    }
}

impl<K, N, V> Debug for ColumnFamily<K, N, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnFamily")
            .field("keyspace", &self.keyspace.name)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

// Constructors
impl<K, N, V> ColumnFamily<K, N, V> {
    pub(crate) fn new(
        keyspace: Arc<Shared>,
        name: String,
        key_codec: Arc<dyn Codec<Value = K>>,
        name_codec: Arc<dyn Codec<Value = N>>,
        value_codec: Arc<dyn Codec<Value = V>>,
    ) -> Self {
        let params = keyspace.params.clone();

        Self {
            keyspace,
            name,
            key_codec,
            name_codec,
            value_codec,
            params,
        }
    }

    /// Returns a copy of this family issuing requests with `params`.
    pub fn with_params(mut self, params: impl Into<CrudParams>) -> Self {
        self.params = params.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace.name
    }

    pub fn params(&self) -> &CrudParams {
        &self.params
    }

    /// Creates a column stamped with the keyspace clock.
    pub fn new_column(&self, name: N, value: V) -> Column<N, V> {
        Column::with_clock_timestamp(name, value, self.timestamp())
    }

    pub(crate) fn timestamp(&self) -> i64 {
        self.keyspace.clock.timestamp()
    }
}

// Encoding / decoding
impl<K, N, V> ColumnFamily<K, N, V>
where
    N: Ord + Clone,
{
    pub(crate) fn encode_key(&self, key: &K) -> Vec<u8> {
        self.key_codec.encode(key)
    }

    pub(crate) fn encode_name(&self, name: &N) -> Vec<u8> {
        self.name_codec.encode(name)
    }

    pub(crate) fn encode_names(&self, names: &[N]) -> Vec<Vec<u8>> {
        names.iter().map(|name| self.encode_name(name)).collect()
    }

    pub(crate) fn encode_column(&self, column: &Column<N, V>) -> RawColumn {
        RawColumn {
            name: self.encode_name(column.name()),
            value: self.value_codec.encode(column.value()),
            timestamp: column.timestamp(),
            ttl: column.ttl(),
        }
    }

    pub(crate) fn decode_key(&self, bytes: &[u8]) -> codec::Result<K> {
        self.key_codec.decode(bytes)
    }

    pub(crate) fn decode_column(&self, raw: RawColumn) -> codec::Result<Column<N, V>> {
        let name = self.name_codec.decode(&raw.name)?;
        let value = self.value_codec.decode(&raw.value)?;
        let column = Column::with_clock_timestamp(name, value, raw.timestamp);

        Ok(match raw.ttl {
            Some(ttl) => column.with_ttl(ttl),
            None => column,
        })
    }

    pub(crate) fn decode_columns(
        &self,
        raws: Vec<RawColumn>,
    ) -> codec::Result<BTreeMap<N, Column<N, V>>> {
        raws.into_iter()
            .map(|raw| {
                let column = self.decode_column(raw)?;
                Ok((column.name().clone(), column))
            })
            .collect()
    }
}

// Requests
impl<K, N, V> ColumnFamily<K, N, V> {
    async fn call(
        &self,
        operation: Operation,
        consistency: ConsistencyLevel,
    ) -> core::result::Result<Response, TransportError> {
        debug!(
            "{} on {}.{} at {:?}",
            operation.name(),
            self.keyspace.name,
            self.name,
            consistency
        );

        let request = Request {
            family: self.name.clone(),
            consistency,
            operation,
        };
        let call = self.keyspace.transport.execute(request);

        match self.params.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call).await?,
            None => call.await,
        }
    }

    pub(crate) async fn read(&self, operation: Operation) -> Result<Response> {
        self.keyspace.ensure_open()?;

        self.call(operation, self.params.read_consistency)
            .await
            .map_err(Error::Read)
    }

    pub(crate) async fn write(&self, operation: Operation) -> Result<()> {
        self.keyspace.ensure_open()?;

        self.call(operation, self.params.write_consistency)
            .await
            .map_err(Error::Write)?
            .into_applied()
    }

    async fn mutate(&self, mutation: Mutation) -> Result<()> {
        self.write(Operation::Mutate {
            mutations: vec![mutation],
        })
        .await
    }
}

// Get
impl<K, N, V> ColumnFamily<K, N, V>
where
    K: Send + Sync + 'static,
    N: Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Reads a single column.
    ///
    /// Returns `Ok(None)` when either the row or the column does not exist.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use grapple_cassandra::ColumnFamily;
    /// # async fn example(cf: ColumnFamily<String, String, String>) -> grapple_cassandra::Result<()> {
    /// let name = cf.get_column(&"yay for me".into(), &"name".into()).await?;
    ///
    /// if let Some(column) = name {
    ///     println!("{} = {}", column.name(), column.value());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_column(&self, key: &K, name: &N) -> Result<Option<Column<N, V>>> {
        let operation = Operation::Get {
            key: self.encode_key(key),
            columns: ColumnSelection::Names(vec![self.encode_name(name)]),
        };

        let raw = self.read(operation).await?.into_columns()?.into_iter().next();

        Ok(raw.map(|raw| self.decode_column(raw)).transpose()?)
    }

    /// Reads the given columns of one row. Names without a column are left out.
    pub async fn get_columns(&self, key: &K, names: &[N]) -> Result<BTreeMap<N, Column<N, V>>> {
        let operation = Operation::Get {
            key: self.encode_key(key),
            columns: ColumnSelection::Names(self.encode_names(names)),
        };

        let raws = self.read(operation).await?.into_columns()?;

        Ok(self.decode_columns(raws)?)
    }

    /// Reads every column of a row. A missing row yields an empty [`Row`].
    pub async fn get_row(&self, key: &K) -> Result<Row<K, N, V>>
    where
        K: Clone,
    {
        let operation = Operation::Get {
            key: self.encode_key(key),
            columns: ColumnSelection::All,
        };

        let raws = self.read(operation).await?.into_columns()?;

        Ok(Row::new(key.clone(), self.decode_columns(raws)?))
    }

    /// Reads up to `count` columns of a row, in name order, starting after
    /// `start_after` when given.
    pub async fn get_row_slice(
        &self,
        key: &K,
        start_after: Option<&N>,
        count: usize,
    ) -> Result<Vec<Column<N, V>>> {
        if count == 0 {
            return Err(Error::config("slice count must be at least 1"));
        }

        let operation = Operation::ColumnPage {
            key: self.encode_key(key),
            start_after: start_after.map(|name| self.encode_name(name)),
            count,
        };

        let raws = self.read(operation).await?.into_columns()?;

        Ok(raws
            .into_iter()
            .map(|raw| self.decode_column(raw))
            .collect::<codec::Result<_>>()?)
    }

    /// Reads one column from several rows in a single request.
    ///
    /// Every requested key is present in the result; keys without the column
    /// map to `Ok(None)`.
    pub async fn multiget_column(
        &self,
        keys: impl IntoIterator<Item = K>,
        name: &N,
    ) -> Result<HashMap<K, Fetched<Option<Column<N, V>>>>>
    where
        K: Hash + Eq,
    {
        let fetched = self
            .multiget(keys, ColumnSelection::Names(vec![self.encode_name(name)]))
            .await?;

        Ok(fetched
            .into_iter()
            .map(|(key, columns)| {
                let column = columns.map(|mut columns| columns.pop_first().map(|(_, c)| c));
                (key, column)
            })
            .collect())
    }

    /// Reads the given columns from several rows in a single request.
    ///
    /// Every requested key is present in the result; keys without any of the
    /// columns map to an empty map.
    pub async fn multiget_columns(
        &self,
        keys: impl IntoIterator<Item = K>,
        names: &[N],
    ) -> Result<HashMap<K, Fetched<BTreeMap<N, Column<N, V>>>>>
    where
        K: Hash + Eq,
    {
        self.multiget(keys, ColumnSelection::Names(self.encode_names(names)))
            .await
    }

    async fn multiget(
        &self,
        keys: impl IntoIterator<Item = K>,
        columns: ColumnSelection,
    ) -> Result<HashMap<K, Fetched<BTreeMap<N, Column<N, V>>>>>
    where
        K: Hash + Eq,
    {
        let mut requested: HashMap<Vec<u8>, K> = keys
            .into_iter()
            .map(|key| (self.encode_key(&key), key))
            .collect();

        let operation = Operation::MultiGet {
            keys: requested.keys().cloned().collect(),
            columns,
        };

        let rows = self.read(operation).await?.into_rows()?;

        let mut fetched = HashMap::with_capacity(requested.len());
        for row in rows {
            if let Some(key) = requested.remove(&row.key) {
                fetched.insert(key, self.decode_columns(row.columns));
            }
        }
        fetched.extend(requested.into_values().map(|key| (key, Ok(BTreeMap::new()))));

        Ok(fetched)
    }
}

// Write
impl<K, N, V> ColumnFamily<K, N, V>
where
    K: Send + Sync + 'static,
    N: Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Writes a single column.
    pub async fn insert(&self, key: &K, column: &Column<N, V>) -> Result<()> {
        self.mutate(Mutation::Insert {
            key: self.encode_key(key),
            column: self.encode_column(column),
        })
        .await
    }

    /// Deletes a single column. The store records a tombstone stamped with the
    /// keyspace clock.
    pub async fn remove_column(&self, key: &K, name: &N) -> Result<()> {
        self.mutate(Mutation::RemoveColumn {
            key: self.encode_key(key),
            name: self.encode_name(name),
            timestamp: self.timestamp(),
        })
        .await
    }

    pub async fn remove_columns(&self, key: &K, names: &[N]) -> Result<()> {
        self.mutate(Mutation::RemoveColumns {
            key: self.encode_key(key),
            names: self.encode_names(names),
            timestamp: self.timestamp(),
        })
        .await
    }

    /// Deletes every column of a row written before now.
    pub async fn remove_row(&self, key: &K) -> Result<()> {
        self.mutate(Mutation::RemoveRow {
            key: self.encode_key(key),
            timestamp: self.timestamp(),
        })
        .await
    }

    /// Starts an empty batch bound to this family.
    pub fn batch(&self) -> Batch<K, N, V> {
        Batch::new(self.clone())
    }
}

// Cursors
impl<K, N, V> ColumnFamily<K, N, V>
where
    K: Send + Sync + 'static,
    N: Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Iterates over every row of the family, `page_size` rows per request.
    ///
    /// Fails with [`Error::Config`] when `page_size` is zero.
    pub fn rows_cursor(&self, page_size: usize) -> Result<RowsCursor<K, N, V>> {
        Cursor::new(RowPages::new(self.clone()), page_size)
    }

    /// Iterates over the columns of one row, `page_size` columns per request.
    ///
    /// Fails with [`Error::Config`] when `page_size` is zero.
    pub fn columns_cursor(&self, page_size: usize, key: &K) -> Result<ColumnsCursor<K, N, V>> {
        Cursor::new(
            ColumnPages::new(self.clone(), self.encode_key(key)),
            page_size,
        )
    }
}

// region:    --- Tests


// endregion: --- Tests
