//! Channel abstraction for operator message I/O.

pub mod cli;
pub mod twilio;

pub use cli::CliChannel;
pub use twilio::{TwilioConfig, TwilioNotifier};

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Transport-assigned id of an outbound message (Twilio SID, local counter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text command received from the operator.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Channel the message arrived on.
    pub channel: String,
    /// Sender identity (phone number for SMS).
    pub sender: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            sender: sender.into(),
            content: content.into(),
            received_at: Utc::now(),
        }
    }
}

/// Stream of inbound operator messages.
pub type MessageStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// Outbound side of a channel. Sends are fire-and-forget from the
/// workflow's point of view; callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> Result<MessageId, ChannelError>;
}

/// Check a sender against an allow-list.
///
/// - Empty list → deny all
/// - `*` in list → allow all
/// - otherwise exact match, ignoring spaces/dashes so `+1 555-0100` matches `+15550100`
pub fn is_sender_allowed(allowed: &[String], sender: &str) -> bool {
    let normalize = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
    };
    let sender = normalize(sender);
    allowed
        .iter()
        .any(|a| a == "*" || normalize(a) == sender)
}
