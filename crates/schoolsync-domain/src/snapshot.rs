use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{SnapshotError, TableName};

/// Format tag written into every snapshot.
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0.0";

/// A single table row. Backups never look inside rows.
pub type Row = Map<String, Value>;

/// Point-in-time capture of every tracked table.
///
/// All [`TableName::ALL`] keys are always present; tables without rows hold an
/// empty sequence. Snapshots are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct Snapshot {
    #[serde(serialize_with = "serialize_instant")]
    timestamp: DateTime<Utc>,
    version: String,
    tables: BTreeMap<TableName, Vec<Row>>,
}

impl Snapshot {
    /// Builds a snapshot, filling every table absent from `tables` with no rows.
    pub fn new(timestamp: DateTime<Utc>, mut tables: BTreeMap<TableName, Vec<Row>>) -> Self {
        for table in TableName::ALL {
            tables.entry(table).or_default();
        }
        Self {
            timestamp,
            version: SNAPSHOT_FORMAT_VERSION.to_string(),
            tables,
        }
    }

    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, BTreeMap::new())
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rows(&self, table: TableName) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tables(&self) -> impl Iterator<Item = (TableName, &[Row])> + '_ {
        self.tables
            .iter()
            .map(|(table, rows)| (*table, rows.as_slice()))
    }

    pub fn row_count(&self, table: TableName) -> usize {
        self.rows(table).len()
    }

    pub fn row_counts(&self) -> BTreeMap<TableName, usize> {
        self.tables
            .iter()
            .map(|(table, rows)| (*table, rows.len()))
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

fn serialize_instant<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Deserialize)]
struct RawSnapshot {
    timestamp: DateTime<Utc>,
    version: String,
    tables: BTreeMap<String, Vec<Row>>,
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = SnapshotError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        ensure_supported_version(&raw.version)?;
        let mut source = raw.tables;
        let mut tables = BTreeMap::new();
        for table in TableName::ALL {
            let rows = source
                .remove(table.as_str())
                .ok_or_else(|| SnapshotError::MissingTable(table.as_str().to_string()))?;
            tables.insert(table, rows);
        }
        // Keys outside the tracked set come from newer writers and are dropped.
        Ok(Self {
            timestamp: raw.timestamp,
            version: raw.version,
            tables,
        })
    }
}

fn major_version(tag: &str) -> Result<u32, SnapshotError> {
    tag.trim()
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .ok_or_else(|| SnapshotError::InvalidVersion(tag.to_string()))
}

fn ensure_supported_version(tag: &str) -> Result<(), SnapshotError> {
    let supported = major_version(SNAPSHOT_FORMAT_VERSION)?;
    if major_version(tag)? > supported {
        return Err(SnapshotError::UnsupportedVersion {
            found: tag.to_string(),
            supported: SNAPSHOT_FORMAT_VERSION.to_string(),
        });
    }
    Ok(())
}
