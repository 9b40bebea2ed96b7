//! Offline summarizer: counts and averages only.

use async_trait::async_trait;

use super::Summarizer;
use crate::error::LlmError;
use crate::reviews::Review;

/// Used when no LLM key is configured.
#[derive(Debug, Default, Clone)]
pub struct StatsSummarizer;

impl StatsSummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Summarizer for StatsSummarizer {
    async fn summarize(&self, reviews: &[Review]) -> Result<String, LlmError> {
        if reviews.is_empty() {
            return Ok("No reviews to summarize.".to_string());
        }

        let mut histogram = [0usize; 5];
        for review in reviews {
            histogram[review.star_rating.get() as usize - 1] += 1;
        }
        let total: usize = reviews.iter().map(|r| r.star_rating.get() as usize).sum();
        let average = total as f64 / reviews.len() as f64;

        let breakdown = (1..=5)
            .rev()
            .map(|stars| format!("{stars}★ {}", histogram[stars - 1]))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "Total reviews analyzed: {}\nAverage rating: {average:.1}/5\nBreakdown: {breakdown}",
            reviews.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::StarRating;
    use chrono::Utc;

    #[tokio::test]
    async fn summarizes_counts() {
        let reviews: Vec<Review> = [5, 4, 3]
            .into_iter()
            .enumerate()
            .map(|(i, stars)| {
                Review::new(
                    format!("r{i}"),
                    StarRating::new(stars).unwrap(),
                    "",
                    "A",
                    Utc::now(),
                )
            })
            .collect();

        let summary = StatsSummarizer::new().summarize(&reviews).await.unwrap();
        assert!(summary.contains("Total reviews analyzed: 3"));
        assert!(summary.contains("Average rating: 4.0/5"));
        assert!(summary.contains("5★ 1, 4★ 1, 3★ 1, 2★ 0, 1★ 0"));
    }

    #[tokio::test]
    async fn empty_batch() {
        let summary = StatsSummarizer::new().summarize(&[]).await.unwrap();
        assert_eq!(summary, "No reviews to summarize.");
    }
}
