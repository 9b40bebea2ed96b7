//! libSQL backend: `CheckpointStore` backed by a local file or in-memory database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::CheckpointStore;

/// Row name holding the daily run checkpoint.
const LAST_CHECKED: &str = "last_checked";

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlCheckpointStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlCheckpointStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl CheckpointStore for LibSqlCheckpointStore {
    async fn get_last_checkpoint(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM checkpoints WHERE name = ?1",
                params![LAST_CHECKED],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_last_checkpoint: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_last_checkpoint row: {e}")))?;
                let at = DateTime::parse_from_rfc3339(&value)
                    .map_err(|e| {
                        DatabaseError::Query(format!("Stored checkpoint {value:?} is invalid: {e}"))
                    })?
                    .with_timezone(&Utc);
                Ok(Some(at))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_last_checkpoint: {e}"))),
        }
    }

    async fn set_last_checkpoint(&self, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO checkpoints (name, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![LAST_CHECKED, at.to_rfc3339(), now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_last_checkpoint: {e}")))?;
        debug!(checkpoint = %at, "Checkpoint saved");
        Ok(())
    }
}
