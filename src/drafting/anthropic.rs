//! Review summaries from Claude, through rig's Anthropic provider.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::anthropic;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use super::Summarizer;
use crate::error::LlmError;
use crate::reviews::Review;

const PROVIDER: &str = "anthropic";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const MAX_TOKENS: u64 = 500;

/// Anthropic configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl AnthropicConfig {
    /// Returns `None` if `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())?;
        let model =
            std::env::var("REVIEW_OUTREACH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self {
            api_key: SecretString::from(api_key),
            model,
        })
    }
}

/// Summarizer backed by a single Anthropic completion.
pub struct AnthropicSummarizer {
    client: rig::client::Client<anthropic::client::AnthropicExt>,
    model: String,
}

impl AnthropicSummarizer {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        let client: rig::client::Client<anthropic::client::AnthropicExt> =
            anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to create Anthropic client: {}", e),
                }
            })?;
        info!(model = %config.model, "Using Anthropic summarizer");
        Ok(Self {
            client,
            model: config.model,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Prompt asking for the digest the operator reads over SMS.
fn build_prompt(reviews: &[Review]) -> String {
    let review_texts = reviews
        .iter()
        .map(|r| {
            let comment = if r.comment.is_empty() {
                "No comment"
            } else {
                r.comment.as_str()
            };
            format!("Rating: {} - {comment}", r.star_rating)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful assistant that analyzes customer reviews for businesses.\n\n\
         Please provide a concise summary of these business reviews:\n\n\
         {review_texts}\n\n\
         Include:\n\
         1. Overall sentiment\n\
         2. Average rating\n\
         3. Common themes or issues mentioned\n\
         4. Key strengths highlighted\n\
         5. Areas for improvement\n\
         6. Total number of reviews analyzed\n\n\
         Keep the summary professional and actionable."
    )
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, reviews: &[Review]) -> Result<String, LlmError> {
        if reviews.is_empty() {
            return Ok("No reviews to summarize.".to_string());
        }

        let model = self.client.completion_model(&self.model);
        let response = model
            .completion_request(build_prompt(reviews))
            .max_tokens(MAX_TOKENS)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic summarize request failed");
                LlmError::RequestFailed {
                    provider: PROVIDER.into(),
                    reason: e.to_string(),
                }
            })?;

        response_text(response.choice)
    }
}

/// First non-empty text block of a completion.
fn response_text(
    choice: impl IntoIterator<Item = AssistantContent>,
) -> Result<String, LlmError> {
    choice
        .into_iter()
        .find_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text.trim().to_string()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: "response contained no text".into(),
        })
}
