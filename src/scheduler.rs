//! Daily run scheduler: a cron expression evaluated in a fixed timezone.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::workflow::WorkflowEngine;

/// 9 PM every day.
pub const DEFAULT_SCHEDULE: &str = "0 0 21 * * *";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// When the daily run fires.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    schedule: cron::Schedule,
    timezone: Tz,
}

impl DailySchedule {
    /// Parse a cron expression and IANA timezone name.
    ///
    /// Five-field expressions (no seconds) are accepted and fire at second 0.
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, ConfigError> {
        let expression = expression.trim();
        let expression = if expression.split_whitespace().count() == 5 {
            format!("0 {expression}")
        } else {
            expression.to_string()
        };

        let schedule =
            cron::Schedule::from_str(&expression).map_err(|e| ConfigError::InvalidValue {
                key: "REVIEW_OUTREACH_SCHEDULE".into(),
                message: format!("invalid cron {expression:?}: {e}"),
            })?;
        let timezone = timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "REVIEW_OUTREACH_TIMEZONE".into(),
                message: e.to_string(),
            })?;

        Ok(Self { schedule, timezone })
    }

    /// First fire strictly after `after`.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.timezone))
            .next()
            .map(|at| at.with_timezone(&Utc))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

/// Spawn a task that sleeps until each fire time and triggers the daily run.
pub fn spawn_daily_ticker(
    engine: Arc<WorkflowEngine>,
    schedule: DailySchedule,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = schedule.next_fire_after(now) else {
                warn!("Schedule has no upcoming fire time; daily runs stopped");
                break;
            };
            info!(
                next = %next.with_timezone(&schedule.timezone()),
                "Next daily review run scheduled"
            );

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let status = engine.trigger_daily_run().await;
            info!(phase = ?status.phase, reviews = status.total_reviews, "Scheduled daily run finished");
        }
    })
}
