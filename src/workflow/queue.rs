//! Review queue: the ordered list of reviews for one daily run, plus a
//! forward-only cursor marking the next review to prompt for.

use crate::error::WorkflowError;
use crate::reviews::Review;

/// Ordered, cursor-based review sequence.
///
/// Invariant: `0 <= cursor <= reviews.len()`. The cursor never moves
/// backwards; only [`ReviewQueue::replace`] resets it.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
    reviews: Vec<Review>,
    cursor: usize,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new run's reviews and rewind to the first one.
    pub fn replace(&mut self, reviews: Vec<Review>) {
        self.reviews = reviews;
        self.cursor = 0;
    }

    /// Review at the cursor, or `None` once the queue is exhausted.
    pub fn current(&self) -> Option<&Review> {
        self.reviews.get(self.cursor)
    }

    /// Review at a zero-based index.
    pub fn get(&self, index: usize) -> Option<&Review> {
        self.reviews.get(index)
    }

    /// Record that the operator acted on `index`: the cursor moves past it
    /// unless it is already further along.
    pub fn advance_to(&mut self, index: usize) -> Result<(), WorkflowError> {
        if index >= self.reviews.len() {
            return Err(WorkflowError::IndexOutOfRange {
                number: index + 1,
                len: self.reviews.len(),
            });
        }
        self.cursor = self.cursor.max(index + 1);
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.reviews.len()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
