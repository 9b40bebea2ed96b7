//! Review sources: where reviews come from and where replies go.

pub mod google;
pub mod mock;
pub mod model;

pub use google::{GoogleBusinessClient, GoogleConfig};
pub use mock::MockReviewSource;
pub use model::{Review, StarRating};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::SourceError;

/// Reviews created within this window stay actionable even if already replied
/// to, so the operator can follow up or correct a reply.
pub const FOLLOW_UP_WINDOW_HOURS: i64 = 24;

/// Backend-agnostic review source.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &str;

    /// Reviews needing attention, optionally only those created after `since`.
    async fn fetch_unanswered(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Review>, SourceError>;

    /// Reviews new since `since`, alongside every review needing attention.
    ///
    /// The default fetches both sets concurrently. Sources that pay for each
    /// listing should fetch once and split locally with [`filter_unanswered`].
    async fn fetch_new_and_all(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<(Vec<Review>, Vec<Review>), SourceError> {
        tokio::try_join!(self.fetch_unanswered(since), self.fetch_unanswered(None))
    }

    /// Post `text` as the public reply to `review_id`.
    async fn submit_reply(&self, review_id: &str, text: &str) -> Result<(), SourceError>;
}

/// Apply the "since" and "unanswered" rules to a raw review list.
pub fn filter_unanswered(
    reviews: Vec<Review>,
    since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<Review> {
    let follow_up_cutoff = now - Duration::hours(FOLLOW_UP_WINDOW_HOURS);
    reviews
        .into_iter()
        .filter(|r| since.is_none_or(|since| r.created_at > since))
        .filter(|r| !r.has_existing_reply || r.created_at > follow_up_cutoff)
        .collect()
}
