//! CQL transport for Cassandra and ScyllaDB, built on the `scylla` driver.
//!
//! Column families are read and written through their CQL view, the layout
//! Cassandra exposes for compact-storage column families:
//!
//! ```cql
//! CREATE TABLE "Standard1" (
//!     key blob,
//!     column1 blob,
//!     value blob,
//!     PRIMARY KEY (key, column1)
//! );
//! ```
//!
//! Rows are scanned in partitioner token order and columns in clustering
//! (byte) order. Statements are prepared once and cached by a
//! `CachingSession`.
//!
//! # Modules
//!
//! - `connection`: Defines parameters for establishing the session to the cluster.
//! - `transport`: Implements [`Transport`](crate::transport::Transport) on top of the session.

// region:    --- Modules

mod connection;
mod transport;

pub use connection::ConnectionParams;
pub use transport::ScyllaTransport;

// endregion: --- Modules
