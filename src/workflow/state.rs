//! Mutable state of the workflow, guarded by the engine's workflow lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::reviews::Review;
use crate::workflow::confirmations::ConfirmationStore;
use crate::workflow::queue::ReviewQueue;

/// Where the engine is in its daily cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No daily run has happened yet.
    Idle,
    /// Prompts are outstanding.
    RunInProgress,
    /// Every review in the latest run has been acted on.
    RunComplete,
}

/// Bookkeeping for the latest daily run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub new_count: usize,
    pub carried_over: usize,
}

impl RunInfo {
    pub fn new(started_at: DateTime<Utc>, new_count: usize, carried_over: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            new_count,
            carried_over,
        }
    }
}

/// Queue, pending confirmations, and the current run.
///
/// A new run replaces the queue but keeps pending confirmations, so codes
/// issued during an earlier run stay resolvable.
#[derive(Default)]
pub struct WorkflowRunState {
    pub queue: ReviewQueue,
    pub confirmations: ConfirmationStore,
    pub run: Option<RunInfo>,
}

impl WorkflowRunState {
    pub fn new(confirmations: ConfirmationStore) -> Self {
        Self {
            queue: ReviewQueue::new(),
            confirmations,
            run: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self.run {
            None => RunPhase::Idle,
            Some(_) if self.queue.is_exhausted() => RunPhase::RunComplete,
            Some(_) => RunPhase::RunInProgress,
        }
    }

    /// Swap in a new run's reviews.
    pub fn begin_run(&mut self, run: RunInfo, reviews: Vec<Review>) {
        self.queue.replace(reviews);
        self.run = Some(run);
    }
}

/// Read-only view of the workflow for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    pub phase: RunPhase,
    pub run: Option<RunInfo>,
    /// 1-based number of the next review to prompt for; `total + 1` once done.
    pub next_review: usize,
    pub total_reviews: usize,
    pub pending_confirmations: usize,
}

impl From<&WorkflowRunState> for WorkflowStatus {
    fn from(state: &WorkflowRunState) -> Self {
        Self {
            phase: state.phase(),
            run: state.run.clone(),
            next_review: state.queue.position() + 1,
            total_reviews: state.queue.len(),
            pending_confirmations: state.confirmations.len(),
        }
    }
}
