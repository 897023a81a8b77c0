//! `grapple_cassandra` is a typed, asynchronous client for wide-column stores such as
//! Cassandra and ScyllaDB.
//! It maps the classic row / column model onto typed Rust values through codecs, offers
//! single-operation reads and writes, per-key atomic batches, and cursors that page through
//! rows or columns on demand.
//!
//! The network side is abstracted behind the [`transport::Transport`] trait. The `scylla`
//! feature (enabled by default) provides a CQL transport; [`transport::MemoryTransport`]
//! keeps everything in process memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use grapple_cassandra::{codec::Utf8Codec, Cluster};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let keyspace = Cluster::new(["localhost"]).keyspace("Keyspace1").connect().await?;
//! let cf = keyspace.column_family("Standard1", Utf8Codec, Utf8Codec, Utf8Codec)?;
//!
//! let key = "yay for me".to_string();
//! cf.insert(&key, &cf.new_column("name".into(), "Coda".into())).await?;
//!
//! let name = cf.get_column(&key, &"name".to_string()).await?;
//! assert_eq!(Some("Coda"), name.as_ref().map(|c| c.value().as_str()));
//!
//! keyspace.close().await;
//! # Ok(())
//! # }
//! ```

// region:    --- Modules

use async_trait::async_trait;

// -- Modules

mod batch;
mod cluster;
mod column;
mod column_family;
mod crud;
mod cursor;
mod error;
mod keyspace;

pub mod clock;
pub mod codec;
pub mod transport;

#[cfg(feature = "scylla")]
pub mod scylla;

pub use batch::Batch;
pub use cluster::{Cluster, KeyspaceBuilder, DEFAULT_PORT};
pub use column::{Column, Row};
pub use column_family::{ColumnFamily, Fetched};
pub use crud::{ConsistencyLevel, CrudParams};
pub use cursor::{ColumnPages, ColumnsCursor, Cursor, PageSource, RowPages, RowsCursor};
pub use error::{Error, Result, TransportError};
pub use keyspace::Keyspace;

// endregion: --- Modules

/// Trait for paginating through a sequence fetched from the store.
///
/// Each call to `next_page` issues at most one remote request, and only after
/// the caller is done with the previous page, so memory stays bounded by one
/// page and the consumer controls the pace.
///
/// # Methods
///
/// - `next_page`: Fetches the next page of items.
/// - `skip_page`: Fetches the next page without keeping its items.
/// - `skip_pages`: Skips `page_count` pages.
/// - `page_items`: Returns the items of the current page.
#[async_trait]
pub trait Pagable<E>
where
    E: Send + Sync,
{
    /// Fetches the next page of items.
    ///
    /// Replaces the current page. Returns `None` once the sequence is
    /// exhausted; no request is issued after that.
    async fn next_page(&mut self) -> Result<Option<&[E]>>;

    /// Skips the next page.
    async fn skip_page(&mut self) -> Result<()>;

    /// Skips `page_count` pages.
    async fn skip_pages(&mut self, page_count: usize) -> Result<()> {
        for _ in 0..page_count {
            self.skip_page().await?;
        }

        Ok(())
    }

    /// Returns the items of the current page.
    fn page_items(&self) -> &[E];
}
