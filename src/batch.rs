//! Multi-mutation batches.
//!
//! A [`Batch`] accumulates inserts and removals for any number of keys of one
//! column family and submits them in a single request. The store applies the
//! mutations of each key atomically and in the order they were added; there is
//! no atomicity or ordering guarantee across keys.
//!
//! # Example
//!
//! ```rust,no_run
//! # use grapple_cassandra::ColumnFamily;
//! # async fn example(cf: ColumnFamily<String, String, String>) -> grapple_cassandra::Result<()> {
//! cf.batch()
//!     .remove_column(&"yay for you".into(), &"name".into())
//!     .remove_columns(&"yay for us".into(), &["name".into(), "motto".into()])
//!     .insert(&"yay for nobody".into(), &cf.new_column("name".into(), "Burt".into()))
//!     .insert(&"yay for nobody".into(), &cf.new_column("motto".into(), "'S funny.".into()))
//!     .execute()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use tracing::debug;

use crate::{
    column::Column,
    column_family::ColumnFamily,
    transport::{Mutation, Operation},
    Result,
};

/// A by-value builder of mutations, consumed by [`Batch::execute`].
///
/// Mutations are encoded as they are added; removals are stamped with the
/// keyspace clock at that moment.
#[derive(Debug)]
pub struct Batch<K, N, V> {
    family: ColumnFamily<K, N, V>,
    mutations: Vec<Mutation>,
}

impl<K, N, V> Batch<K, N, V>
where
    K: Send + Sync + 'static,
    N: Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub(crate) fn new(family: ColumnFamily<K, N, V>) -> Self {
        Self {
            family,
            mutations: Vec::new(),
        }
    }

    pub fn insert(mut self, key: &K, column: &Column<N, V>) -> Self {
        self.mutations.push(Mutation::Insert {
            key: self.family.encode_key(key),
            column: self.family.encode_column(column),
        });
        self
    }

    pub fn remove_column(mut self, key: &K, name: &N) -> Self {
        self.mutations.push(Mutation::RemoveColumn {
            key: self.family.encode_key(key),
            name: self.family.encode_name(name),
            timestamp: self.family.timestamp(),
        });
        self
    }

    pub fn remove_columns(mut self, key: &K, names: &[N]) -> Self {
        self.mutations.push(Mutation::RemoveColumns {
            key: self.family.encode_key(key),
            names: self.family.encode_names(names),
            timestamp: self.family.timestamp(),
        });
        self
    }

    pub fn remove_row(mut self, key: &K) -> Self {
        self.mutations.push(Mutation::RemoveRow {
            key: self.family.encode_key(key),
            timestamp: self.family.timestamp(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Submits every mutation in one request.
    ///
    /// A failure is reported as a single [`Error::Write`](crate::Error::Write);
    /// the store may have applied some key groups before failing. An empty
    /// batch completes without contacting the store.
    pub async fn execute(self) -> Result<()> {
        if self.mutations.is_empty() {
            debug!("Skipping empty batch on {}", self.family.name());
            return Ok(());
        }

        debug!(
            "Executing batch of {} mutations on {}",
            self.mutations.len(),
            self.family.name()
        );

        self.family
            .write(Operation::Mutate {
                mutations: self.mutations,
            })
            .await
    }
}

// region:    --- Tests


// endregion: --- Tests
