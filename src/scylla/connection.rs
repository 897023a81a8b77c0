use scylla::{
    client::{
        caching_session::{CachingSession, CachingSessionBuilder},
        session::Session,
        session_builder::SessionBuilder,
    },
    errors::NewSessionError,
    frame::Compression,
};
use std::time::Duration;

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            caching_capacity: 1000,
            connection_timeout: Duration::from_secs(3),
            compression: None,
            keyspace_case_sensitive: false,
            create_keyspace: false,
            replication_factor: 1,
        }
    }
}

/// Options of the CQL connection pool.
///
/// # Fields
///
/// - `connection_timeout`: Time allowed to establish a connection to a node.
/// - `caching_capacity`: Number of prepared statements kept per session.
/// - `compression`: Frame compression negotiated with the nodes.
/// - `keyspace_case_sensitive`: Whether the keyspace name is quoted when selected.
/// - `create_keyspace`: Create the keyspace (`SimpleStrategy`) when opening it.
/// - `replication_factor`: Replication factor used by `create_keyspace`.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub connection_timeout: Duration,
    pub caching_capacity: usize,
    pub compression: Option<Compression>,
    pub keyspace_case_sensitive: bool,
    pub create_keyspace: bool,
    pub replication_factor: u32,
}

impl ConnectionParams {
    pub async fn build(&self, seeds: &[String]) -> Result<Session, NewSessionError> {
        let builder = SessionBuilder::new()
            .known_nodes(seeds)
            .connection_timeout(self.connection_timeout)
            .compression(self.compression);

        builder.build().await
    }

    pub async fn caching(&self, seeds: &[String]) -> Result<CachingSession, NewSessionError> {
        let session = self.build(seeds).await?;

        let caching = CachingSessionBuilder::new(session)
            .max_capacity(self.caching_capacity)
            .build();

        Ok(caching)
    }
}
