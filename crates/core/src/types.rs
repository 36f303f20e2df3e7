//! Identifier types shared by the client and the engines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine-assigned entity identifier. Callers read these from responses,
/// they never mint them.
pub type EntityId = i64;

/// Engine configuration identifier.
pub type ConfigId = i64;

/// A record reference: data source code plus record id.
///
/// Both parts are case-sensitive and passed to the engine unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Data source code, e.g. `CUSTOMERS`
    #[serde(rename = "DATA_SOURCE")]
    pub data_source: String,
    /// Record id within the data source
    #[serde(rename = "RECORD_ID")]
    pub record_id: String,
}

impl RecordKey {
    /// Create a record key.
    pub fn new(data_source: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            record_id: record_id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.data_source, self.record_id)
    }
}

impl<D: Into<String>, R: Into<String>> From<(D, R)> for RecordKey {
    fn from((data_source, record_id): (D, R)) -> Self {
        RecordKey::new(data_source, record_id)
    }
}

/// Opaque handle of an open export report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportHandle(pub u64);

impl ExportHandle {
    /// Raw handle value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
