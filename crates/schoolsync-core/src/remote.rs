use std::collections::BTreeMap;

use async_trait::async_trait;
use schoolsync_domain::{Row, TableName};
use thiserror::Error;
use tokio::sync::RwLock;

/// Failure reported by the remote store collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The authoritative relational store holding live application data.
///
/// Every call is a plain, unfiltered CRUD request; nothing is wrapped in a
/// transaction by callers.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select_all(&self, table: TableName) -> Result<Vec<Row>, RemoteError>;
    async fn delete_all(&self, table: TableName) -> Result<(), RemoteError>;
    async fn insert_many(&self, table: TableName, rows: Vec<Row>) -> Result<(), RemoteError>;
}

/// In-process remote store, used by tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    tables: RwLock<BTreeMap<TableName, Vec<Row>>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: BTreeMap<TableName, Vec<Row>>) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn rows(&self, table: TableName) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn replace(&self, table: TableName, rows: Vec<Row>) {
        self.tables.write().await.insert(table, rows);
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn select_all(&self, table: TableName) -> Result<Vec<Row>, RemoteError> {
        Ok(self.rows(table).await)
    }

    async fn delete_all(&self, table: TableName) -> Result<(), RemoteError> {
        self.tables.write().await.remove(&table);
        Ok(())
    }

    async fn insert_many(&self, table: TableName, rows: Vec<Row>) -> Result<(), RemoteError> {
        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .extend(rows);
        Ok(())
    }
}
