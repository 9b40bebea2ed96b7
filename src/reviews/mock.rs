//! Mock review source for local runs (`USE_MOCK_DATA=true`).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::info;

use super::model::{Review, StarRating};
use super::{ReviewSource, filter_unanswered};
use crate::error::SourceError;

/// Serves three fixed restaurant reviews and records replies instead of
/// posting them.
#[derive(Default)]
pub struct MockReviewSource {
    submitted: Mutex<Vec<(String, String)>>,
}

impl MockReviewSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies "submitted" so far, as `(review_id, text)`.
    pub async fn submitted(&self) -> Vec<(String, String)> {
        self.submitted.lock().await.clone()
    }

    fn reviews(now: DateTime<Utc>) -> Vec<Review> {
        let fixtures: [(&str, u8, &str, &str, Duration); 3] = [
            (
                "accounts/123/locations/456/reviews/review1",
                5,
                "Amazing Chinese food! The Beijing duck was perfectly cooked and the service was excellent. Will definitely come back!",
                "John D.",
                Duration::hours(2),
            ),
            (
                "accounts/123/locations/456/reviews/review2",
                4,
                "Good food but the wait time was a bit long. The dumplings were delicious though.",
                "Sarah M.",
                Duration::hours(6),
            ),
            (
                "accounts/123/locations/456/reviews/review3",
                5,
                "Best Chinese restaurant in the area! Fresh ingredients and authentic flavors.",
                "Mike R.",
                Duration::days(2),
            ),
        ];

        fixtures
            .into_iter()
            .filter_map(|(id, stars, comment, name, age)| {
                let rating = StarRating::new(stars)?;
                Some(Review::new(id, rating, comment, name, now - age))
            })
            .collect()
    }
}

#[async_trait]
impl ReviewSource for MockReviewSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_unanswered(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Review>, SourceError> {
        let now = Utc::now();
        Ok(filter_unanswered(Self::reviews(now), since, now))
    }

    async fn submit_reply(&self, review_id: &str, text: &str) -> Result<(), SourceError> {
        info!(review_id, reply = text, "Mock source: reply recorded, not posted");
        self.submitted
            .lock()
            .await
            .push((review_id.to_string(), text.to_string()));
        Ok(())
    }
}
