//! Typed data model: a timestamped [`Column`] and a keyed [`Row`] of columns.

use std::collections::BTreeMap;

use crate::clock::MicrosecondEpochClock;

/// A named, timestamped value.
///
/// Columns are immutable once built; the `with_*` methods consume the column
/// and return a modified copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<N, V> {
    name: N,
    value: V,
    timestamp: i64,
    ttl: Option<u32>,
}

impl<N, V> Column<N, V> {
    /// Creates a column stamped with the process-wide microsecond clock.
    pub fn new(name: N, value: V) -> Self {
        Self::with_clock_timestamp(name, value, MicrosecondEpochClock::now())
    }

    pub(crate) fn with_clock_timestamp(name: N, value: V, timestamp: i64) -> Self {
        Self {
            name,
            value,
            timestamp,
            ttl: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Seconds after which the store expires the column. Passed through as-is.
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn name(&self) -> &N {
        &self.name
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn ttl(&self) -> Option<u32> {
        self.ttl
    }

    pub fn into_pair(self) -> (N, V) {
        (self.name, self.value)
    }
}

/// A row key together with its columns, ordered by column name.
///
/// A row without columns does not exist in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<K, N, V> {
    pub key: K,
    pub columns: BTreeMap<N, Column<N, V>>,
}

impl<K, N, V> Row<K, N, V>
where
    N: Ord,
{
    pub fn new(key: K, columns: BTreeMap<N, Column<N, V>>) -> Self {
        Self { key, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, name: &N) -> Option<&Column<N, V>> {
        self.columns.get(name)
    }
}

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builders() {
        let column = Column::new("name", "Coda").with_timestamp(7).with_ttl(60);

        assert_eq!(&"name", column.name());
        assert_eq!(&"Coda", column.value());
        assert_eq!(7, column.timestamp());
        assert_eq!(Some(60), column.ttl());
    }

    #[test]
    fn test_new_columns_get_increasing_timestamps() {
        let first = Column::new("a", 1);
        let second = Column::new("a", 2);

        assert!(second.timestamp() > first.timestamp());
    }

    #[test]
    fn test_row_without_columns_is_empty() {
        let row: Row<&str, &str, &str> = Row::new("yay for no one", BTreeMap::new());

        assert!(row.is_empty());
        assert_eq!(None, row.get(&"name"));
    }
}

// endregion: --- Tests
