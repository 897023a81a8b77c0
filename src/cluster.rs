use std::{convert::Infallible, str::FromStr, sync::Arc};

use tracing::debug;

use crate::{
    clock::{Clock, MicrosecondEpochClock},
    crud::CrudParams,
    keyspace::{validate_name, Keyspace},
    transport::Transport,
    Result,
};

#[cfg(feature = "scylla")]
use crate::{scylla::ConnectionParams, Error};

/// Port appended to seed hosts given without one (CQL native protocol).
pub const DEFAULT_PORT: u16 = 9042;

/// A set of seed hosts from which keyspaces are mapped.
///
/// Creating a cluster performs no network I/O; hosts are contacted when a
/// keyspace is connected.
///
/// # Example
///
/// ```rust
/// use grapple_cassandra::Cluster;
///
/// let cluster: Cluster = "cass1, cass2:9043".parse().unwrap();
///
/// assert_eq!(["cass1:9042", "cass2:9043"], cluster.seeds());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    seeds: Vec<String>,
}

fn with_port(host: &str) -> String {
    let has_port = match host.rsplit_once(':') {
        Some((name, port)) => {
            port.parse::<u16>().is_ok() && (!name.contains(':') || name.ends_with(']'))
        }
        None => false,
    };

    if has_port || host.is_empty() {
        host.to_string()
    } else if host.starts_with('[') {
        format!("{host}:{DEFAULT_PORT}")
    } else if host.contains(':') {
        format!("[{host}]:{DEFAULT_PORT}")
    } else {
        format!("{host}:{DEFAULT_PORT}")
    }
}

impl Cluster {
    pub fn new<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seeds = seeds
            .into_iter()
            .map(|seed| seed.as_ref().trim().to_string())
            .filter(|seed| !seed.is_empty())
            .map(|seed| with_port(&seed))
            .collect();

        Self { seeds }
    }

    /// Seed hosts as `host:port`.
    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    pub fn keyspace(&self, name: impl Into<String>) -> KeyspaceBuilder {
        KeyspaceBuilder {
            seeds: self.seeds.clone(),
            name: name.into(),
            params: CrudParams::default(),
            clock: Arc::new(MicrosecondEpochClock::new()),
            #[cfg(feature = "scylla")]
            connection: ConnectionParams::default(),
        }
    }
}

impl FromStr for Cluster {
    type Err = Infallible;

    /// Parses a comma separated list of seed hosts.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Self::new(s.split(',')))
    }
}

/// Configures and connects a [`Keyspace`].
#[derive(Debug, Clone)]
pub struct KeyspaceBuilder {
    seeds: Vec<String>,
    name: String,
    params: CrudParams,
    clock: Arc<dyn Clock>,
    #[cfg(feature = "scylla")]
    connection: ConnectionParams,
}

impl KeyspaceBuilder {
    /// Default request options of every column family of the keyspace.
    pub fn params(mut self, params: impl Into<CrudParams>) -> Self {
        self.params = params.into();
        self
    }

    /// Clock stamping new columns and removals.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[cfg(feature = "scylla")]
    pub fn connection(mut self, connection: ConnectionParams) -> Self {
        self.connection = connection;
        self
    }

    /// Connects to the seed hosts over CQL and opens the keyspace.
    ///
    /// Fails with [`Error::Config`] when the cluster has no seeds and with
    /// [`Error::Connect`] when none of them can be reached.
    #[cfg(feature = "scylla")]
    pub async fn connect(self) -> Result<Keyspace> {
        use crate::scylla::ScyllaTransport;

        if self.seeds.is_empty() {
            return Err(Error::config("cluster has no seed hosts"));
        }

        let transport = ScyllaTransport::connect(&self.seeds, self.connection.clone())
            .await
            .map_err(Error::Connect)?;

        self.connect_with(Arc::new(transport)).await
    }

    /// Opens the keyspace over an existing transport.
    pub async fn connect_with<T>(self, transport: Arc<T>) -> Result<Keyspace>
    where
        T: Transport + 'static,
    {
        validate_name("keyspace", &self.name)?;

        debug!("Connecting keyspace '{}' via {:?}", self.name, self.seeds);

        Keyspace::open(self.name, transport, self.clock, self.params).await
    }
}

// region:    --- Tests

#[cfg(test)]
mod tests {
    type Result<T> = super::Result<T>; // For tests.

    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::{codec::Utf8Codec, crud::ConsistencyLevel, transport::MemoryTransport, Error};

    #[test]
    fn test_cluster_normalizes_seeds() {
        let cluster = Cluster::new(["localhost", " 10.0.0.1:9999 ", "", "::1", "[::1]"]);

        assert_eq!(
            ["localhost:9042", "10.0.0.1:9999", "[::1]:9042", "[::1]:9042"],
            cluster.seeds()
        );
    }

    #[test]
    fn test_cluster_from_str() {
        let cluster: Cluster = "a,b:1".parse().unwrap();

        assert_eq!(["a:9042", "b:1"], cluster.seeds());
    }

    #[tokio::test]
    async fn test_connect_with_unreachable_transport() {
        let res = Cluster::new(["localhost"])
            .keyspace("Keyspace1")
            .connect_with(Arc::new(MemoryTransport::unreachable()))
            .await;

        assert!(matches!(res, Err(Error::Connect(_))));
    }

    #[tokio::test]
    async fn test_connect_with_invalid_keyspace_name() {
        let res = Cluster::new(["localhost"])
            .keyspace("")
            .connect_with(Arc::new(MemoryTransport::new()))
            .await;

        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[derive(Debug, Default)]
    struct FixedClock(AtomicI64);

    impl Clock for FixedClock {
        fn timestamp(&self) -> i64 {
            self.0.fetch_add(1, Ordering::Relaxed) + 100
        }
    }

    #[tokio::test]
    async fn test_builder_params_and_clock_reach_families() -> Result<()> {
        let keyspace = Cluster::new(["localhost"])
            .keyspace("Keyspace1")
            .params(CrudParams::default().consistency(ConsistencyLevel::One))
            .clock(FixedClock::default())
            .connect_with(Arc::new(MemoryTransport::new()))
            .await?;

        let cf = keyspace.column_family("Standard1", Utf8Codec, Utf8Codec, Utf8Codec)?;

        assert_eq!(ConsistencyLevel::One, cf.params().read_consistency);
        assert_eq!(100, cf.new_column("a".into(), "b".into()).timestamp());
        assert_eq!(101, cf.new_column("a".into(), "b".into()).timestamp());

        Ok(())
    }

    #[cfg(feature = "scylla")]
    #[tokio::test]
    async fn test_connect_without_seeds() {
        let res = Cluster::new(Vec::<String>::new())
            .keyspace("Keyspace1")
            .connect()
            .await;

        assert!(matches!(res, Err(Error::Config(_))));
    }
}

// endregion: --- Tests
