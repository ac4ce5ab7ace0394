use std::path::{Path, PathBuf};

use async_trait::async_trait;
use schoolsync_core::{RemoteError, RemoteStore};
use schoolsync_domain::{Row, TableName};
use tokio::{fs, sync::Mutex};

use crate::fs_util::write_atomic;

/// Remote store kept as one JSON array file per table.
///
/// Lets the CLI run against exported table dumps when no hosted database is
/// reachable.
#[derive(Debug)]
pub struct DirectoryRemoteStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectoryRemoteStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: TableName) -> PathBuf {
        self.root.join(format!("{}.json", table.as_str()))
    }

    async fn read_table(&self, table: TableName) -> Result<Vec<Row>, RemoteError> {
        let path = self.table_path(table);
        match fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|err| RemoteError::new(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(RemoteError::new(format!("{}: {err}", path.display()))),
        }
    }

    async fn write_table(&self, table: TableName, rows: &[Row]) -> Result<(), RemoteError> {
        let path = self.table_path(table);
        let json = serde_json::to_string_pretty(rows)
            .map_err(|err| RemoteError::new(err.to_string()))?;
        write_atomic(&path, &json)
            .await
            .map_err(|err| RemoteError::new(format!("{}: {err}", path.display())))
    }
}

#[async_trait]
impl RemoteStore for DirectoryRemoteStore {
    async fn select_all(&self, table: TableName) -> Result<Vec<Row>, RemoteError> {
        self.read_table(table).await
    }

    async fn delete_all(&self, table: TableName) -> Result<(), RemoteError> {
        let _guard = self.write_lock.lock().await;
        self.write_table(table, &[]).await
    }

    async fn insert_many(&self, table: TableName, rows: Vec<Row>) -> Result<(), RemoteError> {
        let _guard = self.write_lock.lock().await;
        let mut existing = self.read_table(table).await?;
        existing.extend(rows);
        self.write_table(table, &existing).await
    }
}
