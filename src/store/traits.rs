//! `CheckpointStore` trait: where the "last checked" timestamp lives between runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Persistence for the daily run's checkpoint.
///
/// `None` means no run has completed yet, so every unanswered review is new.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_last_checkpoint(&self) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    async fn set_last_checkpoint(&self, at: DateTime<Utc>) -> Result<(), DatabaseError>;
}
