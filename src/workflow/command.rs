//! Inbound operator text → typed workflow command.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CONFIRM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^YES([A-Z0-9]{6})$").unwrap());
static CANCEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^NO([A-Z0-9]{6})$").unwrap());
static REPLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^REPLY([0-9]+)$").unwrap());
static SKIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^SKIP([0-9]+)$").unwrap());

/// A command from the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// `YES<code>`: submit the pending draft.
    ConfirmReply { code: String },
    /// `NO<code>`: discard the pending draft.
    CancelReply { code: String },
    /// `REPLY<n>`: draft a reply for the n-th review (1-based).
    GenerateForIndex { n: usize },
    /// `SKIP<n>`: pass on the n-th review (1-based).
    SkipIndex { n: usize },
    /// Anything else. Carries the text as received.
    Unrecognized { raw: String },
}

/// Parses operator SMS into [`Command`]s.
pub struct CommandParser;

impl CommandParser {
    /// Parse one inbound message. Never fails; unknown text becomes
    /// [`Command::Unrecognized`].
    pub fn parse(raw: &str) -> Command {
        let normalized = raw.trim().to_ascii_uppercase();

        parse_code(&CONFIRM_RE, &normalized)
            .map(|code| Command::ConfirmReply { code })
            .or_else(|| parse_code(&CANCEL_RE, &normalized).map(|code| Command::CancelReply { code }))
            .or_else(|| parse_index(&REPLY_RE, &normalized).map(|n| Command::GenerateForIndex { n }))
            .or_else(|| parse_index(&SKIP_RE, &normalized).map(|n| Command::SkipIndex { n }))
            .unwrap_or_else(|| Command::Unrecognized {
                raw: raw.to_string(),
            })
    }
}

fn parse_code(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

/// Digits that overflow `usize` do not match.
fn parse_index(re: &Regex, text: &str) -> Option<usize> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}
