//! Twilio SMS channel: outbound via the Messages REST API.
//!
//! Inbound SMS arrive through the `/sms/webhook` route (see `routes.rs`);
//! this module only covers configuration and sending.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::channels::{MessageId, Notifier};
use crate::error::ChannelError;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio rejects bodies longer than 1600 characters.
const SMS_MAX_MESSAGE_LENGTH: usize = 1600;

/// Twilio channel configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Twilio number messages are sent from.
    pub from_number: String,
    /// Operator's phone; every notification goes here.
    pub to_number: String,
}

impl TwilioConfig {
    /// Returns `None` if `TWILIO_ACCOUNT_SID` is not set (channel disabled).
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .ok()
            .filter(|s| !s.is_empty())?;
        let auth_token = SecretString::from(std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default());
        let from_number = std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_default();
        let to_number = std::env::var("NOTIFICATION_PHONE_NUMBER").unwrap_or_default();

        Some(Self {
            account_sid,
            auth_token,
            from_number,
            to_number,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Sends operator notifications as SMS.
pub struct TwilioNotifier {
    config: TwilioConfig,
    client: reqwest::Client,
    api_base: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Self {
        Self::with_api_base(config, API_BASE)
    }

    pub fn with_api_base(config: TwilioConfig, api_base: &str) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.config.account_sid
        )
    }

    async fn send_chunk(&self, body: &str) -> Result<MessageId, ChannelError> {
        let form = [
            ("To", self.config.to_number.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "twilio".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            warn!(status = ?status, "Twilio rejected message");
            return Err(ChannelError::SendFailed {
                name: "twilio".into(),
                reason: format!("status {status}: {err}"),
            });
        }

        let resource: MessageResource =
            resp.json().await.map_err(|e| ChannelError::InvalidResponse {
                name: "twilio".into(),
                reason: e.to_string(),
            })?;
        Ok(MessageId(resource.sid))
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    fn name(&self) -> &str {
        "twilio"
    }

    /// Long notifications are split; the id of the last segment is returned.
    async fn send(&self, text: &str) -> Result<MessageId, ChannelError> {
        let mut last = None;
        for chunk in split_message(text, SMS_MAX_MESSAGE_LENGTH) {
            last = Some(self.send_chunk(&chunk).await?);
        }
        let id = last.ok_or_else(|| ChannelError::SendFailed {
            name: "twilio".into(),
            reason: "empty message".into(),
        })?;
        info!(sid = %id, "SMS sent");
        Ok(id)
    }
}

/// Split `text` into chunks of at most `max_len` bytes, preferring newline
/// then space boundaries and never cutting inside a UTF-8 character.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while limit > 0 && !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            // Single character wider than max_len; emit it whole.
            limit = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
