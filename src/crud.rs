use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many replicas must answer before a request is considered successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    #[default]
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

/// Request options applied by a column family to every request it issues.
///
/// `timeout` bounds each remote call, including every page fetch of a cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudParams {
    pub read_consistency: ConsistencyLevel,
    pub write_consistency: ConsistencyLevel,
    pub timeout: Option<Duration>,
}

impl CrudParams {
    pub fn consistency(mut self, level: ConsistencyLevel) -> Self {
        self.read_consistency = level;
        self.write_consistency = level;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&CrudParams> for CrudParams {
    fn from(value: &CrudParams) -> Self {
        value.clone()
    }
}

#[cfg(feature = "scylla")]
impl From<ConsistencyLevel> for scylla::statement::Consistency {
    fn from(value: ConsistencyLevel) -> Self {
        use scylla::statement::Consistency;

        match value {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
        }
    }
}

// region:    --- Tests


// endregion: --- Tests
