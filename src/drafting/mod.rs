//! Summaries and reply drafts for reviews.

pub mod anthropic;
pub mod stats;
pub mod template;

pub use anthropic::{AnthropicConfig, AnthropicSummarizer};
pub use stats::StatsSummarizer;
pub use template::TemplateDrafter;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::reviews::Review;

/// Produces a short operator-facing digest of a batch of reviews.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, reviews: &[Review]) -> Result<String, LlmError>;
}

/// Produces a candidate public reply for one review.
#[async_trait]
pub trait ReplyDrafter: Send + Sync {
    async fn draft_reply(&self, review: &Review) -> Result<String, LlmError>;
}
