use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::debug;

use crate::{
    clock::Clock, codec::Codec, column_family::ColumnFamily, crud::CrudParams, transport::Transport,
    Error, Result,
};

/// State shared by a keyspace and every column family created from it.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) params: CrudParams,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed {
                keyspace: self.name.clone(),
            });
        }

        Ok(())
    }
}

/// Accepts names usable both as Thrift-era column family names and as CQL
/// table identifiers.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config(format!("{kind} name is empty")));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::config(format!(
            "{kind} name '{name}' may only contain ASCII letters, digits and '_'"
        )));
    }

    Ok(())
}

/// A connected keyspace, grouping column families that share one transport.
///
/// A keyspace owns the transport's lifecycle: [`Keyspace::close`] releases it,
/// after which every operation issued through one of its column families fails
/// with [`Error::Closed`].
#[derive(Debug)]
pub struct Keyspace {
    shared: Arc<Shared>,
}

impl Keyspace {
    pub(crate) async fn open(
        name: String,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        params: CrudParams,
    ) -> Result<Self> {
        debug!("Opening keyspace '{}'", name);

        transport.open(&name).await.map_err(Error::Connect)?;

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                transport,
                clock,
                params,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Creates a typed handle on the column family `name`.
    ///
    /// No I/O is performed; an unknown family only surfaces on first use.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use grapple_cassandra::{codec::{Int64Codec, Utf8Codec}, Keyspace};
    /// # fn example(keyspace: &Keyspace) -> grapple_cassandra::Result<()> {
    /// let counters = keyspace.column_family("Counters", Utf8Codec, Utf8Codec, Int64Codec)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn column_family<KC, NC, VC>(
        &self,
        name: &str,
        key_codec: KC,
        name_codec: NC,
        value_codec: VC,
    ) -> Result<ColumnFamily<KC::Value, NC::Value, VC::Value>>
    where
        KC: Codec + 'static,
        NC: Codec + 'static,
        VC: Codec + 'static,
    {
        validate_name("column family", name)?;

        Ok(ColumnFamily::new(
            self.shared.clone(),
            name.to_string(),
            Arc::new(key_codec),
            Arc::new(name_codec),
            Arc::new(value_codec),
        ))
    }

    /// Creates the table backing `name` when it does not exist yet.
    pub async fn ensure_column_family(&self, name: &str) -> Result<()> {
        validate_name("column family", name)?;
        self.shared.ensure_open()?;

        debug!("Ensuring column family '{}.{}'", self.shared.name, name);

        self.shared
            .transport
            .ensure_family(name)
            .await
            .map_err(Error::Write)
    }

    /// Hosts currently backing the keyspace, as reported by the transport.
    pub fn hosts(&self) -> Vec<String> {
        self.shared.transport.hosts()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Releases the pooled connections.
    pub async fn close(self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!("Closing keyspace '{}'", self.shared.name);

        self.shared.transport.close().await;
    }
}

// region:    --- Tests

#[cfg(test)]
mod tests {
    type Result<T> = super::Result<T>; // For tests.

    use super::*;
    use crate::{codec::Utf8Codec, transport::MemoryTransport, Cluster};

    async fn get_keyspace(transport: Arc<MemoryTransport>) -> Keyspace {
        Cluster::new(["localhost"])
            .keyspace("Keyspace1")
            .connect_with(transport)
            .await
            .unwrap()
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("column family", "Standard1").is_ok());
        assert!(validate_name("column family", "user_events").is_ok());
        assert!(validate_name("column family", "").is_err());
        assert!(validate_name("column family", "drop table;").is_err());
    }

    #[tokio::test]
    async fn test_keyspace_open_binds_transport() -> Result<()> {
        let transport = Arc::new(MemoryTransport::new());
        let keyspace = get_keyspace(transport.clone()).await;

        assert_eq!("Keyspace1", keyspace.name());
        assert_eq!(Some("Keyspace1".to_string()), transport.keyspace().await);
        assert_eq!(vec!["in-memory".to_string()], keyspace.hosts());

        keyspace.ensure_column_family("Standard1").await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_keyspace_rejects_invalid_family_name() {
        let keyspace = get_keyspace(Arc::new(MemoryTransport::new())).await;

        let res = keyspace.column_family("bad name", Utf8Codec, Utf8Codec, Utf8Codec);

        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_keyspace_close_fails_later_operations() -> Result<()> {
        let transport = Arc::new(MemoryTransport::new());
        let keyspace = get_keyspace(transport.clone()).await;
        let cf = keyspace.column_family("Standard1", Utf8Codec, Utf8Codec, Utf8Codec)?;

        keyspace.close().await;

        assert!(transport.is_closed());

        let res = cf.get_row(&"yay for me".to_string()).await;
        assert!(matches!(res, Err(Error::Closed { ref keyspace }) if keyspace == "Keyspace1"));

        let res = cf.batch().remove_row(&"yay for me".to_string()).execute().await;
        assert!(res.is_err_and(|e| e.is_closed()));

        Ok(())
    }
}

// endregion: --- Tests
