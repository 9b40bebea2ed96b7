//! Configuration types.

use std::path::PathBuf;

use crate::channels::TwilioConfig;
use crate::drafting::AnthropicConfig;
use crate::error::ConfigError;
use crate::reviews::GoogleConfig;
use crate::scheduler::{DEFAULT_SCHEDULE, DEFAULT_TIMEZONE, DailySchedule};
use crate::workflow::confirmations::DEFAULT_MAX_PENDING;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_PATH: &str = "./data/review-outreach.db";

/// Where the "last checked" checkpoint is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointBackend {
    /// Lost on restart.
    Memory,
    /// libSQL database file.
    File(PathBuf),
}

impl CheckpointBackend {
    fn from_setting(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some(":memory:") => Self::Memory,
            Some(path) if !path.is_empty() => Self::File(PathBuf::from(path)),
            _ => Self::File(PathBuf::from(DEFAULT_DB_PATH)),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    pub schedule: DailySchedule,
    pub checkpoint: CheckpointBackend,
    /// Cap on pending confirmations; the oldest is evicted beyond it.
    pub max_pending: usize,
    /// Read operator commands from stdin and print notifications.
    pub cli: bool,
    /// Serve fixed sample reviews instead of calling Google.
    pub use_mock_data: bool,
    /// Phone numbers allowed to send commands; `*` allows anyone.
    pub allowed_senders: Vec<String>,
    pub google: Option<GoogleConfig>,
    pub twilio: Option<TwilioConfig>,
    pub anthropic: Option<AnthropicConfig>,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// Unparseable numbers fall back to defaults; an invalid schedule or
    /// timezone is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |key: &str| std::env::var(key).ok();

        let port = var("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let schedule = DailySchedule::parse(
            &var("REVIEW_OUTREACH_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
            &var("REVIEW_OUTREACH_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        )?;

        let max_pending = var("REVIEW_OUTREACH_MAX_PENDING")
            .and_then(|s| s.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_MAX_PENDING);

        let twilio = TwilioConfig::from_env();
        let operator = twilio
            .as_ref()
            .map(|t| t.to_number.clone())
            .filter(|n| !n.is_empty());
        let allowed_senders = var("SMS_ALLOWED_SENDERS")
            .map(|s| parse_list(&s))
            .unwrap_or_else(|| operator.into_iter().collect());

        Ok(Self {
            port,
            schedule,
            checkpoint: CheckpointBackend::from_setting(var("REVIEW_OUTREACH_DB_PATH")),
            max_pending,
            cli: parse_flag(var("REVIEW_OUTREACH_CLI").as_deref()),
            use_mock_data: parse_flag(var("USE_MOCK_DATA").as_deref()),
            allowed_senders,
            google: GoogleConfig::from_env()?,
            twilio,
            anthropic: AnthropicConfig::from_env(),
        })
    }
}

/// Comma-separated list, blanks dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
