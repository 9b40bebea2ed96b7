//! In-process checkpoint store. Lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::store::traits::CheckpointStore;

#[derive(Default)]
pub struct MemoryCheckpointStore {
    last: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get_last_checkpoint(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        Ok(*self.last.read().await)
    }

    async fn set_last_checkpoint(&self, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        *self.last.write().await = Some(at);
        Ok(())
    }
}
