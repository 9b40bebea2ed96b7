//! Review data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 1–5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&stars).then_some(Self(stars))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parse the Google Business Profile representation.
    ///
    /// The v4 API reports ratings as enum names (`"FIVE"`); older payloads and
    /// the mock source use plain numbers.
    pub fn from_google(value: &serde_json::Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return u8::try_from(n).ok().and_then(Self::new);
        }
        let stars = match value.as_str()? {
            "ONE" => 1,
            "TWO" => 2,
            "THREE" => 3,
            "FOUR" => 4,
            "FIVE" => 5,
            other => other.parse().ok()?,
        };
        Self::new(stars)
    }

    /// Star emoji row, e.g. `⭐⭐⭐` for three stars.
    pub fn stars(self) -> String {
        "⭐".repeat(self.0 as usize)
    }
}

impl TryFrom<u8> for StarRating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("star rating {value} is outside 1..=5"))
    }
}

impl From<StarRating> for u8 {
    fn from(value: StarRating) -> Self {
        value.0
    }
}

impl std::fmt::Display for StarRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/5", self.0)
    }
}

/// A customer review as reported by the review source. Never mutated by the
/// workflow; each daily run re-fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Source-side reference, e.g. `accounts/1/locations/2/reviews/3`.
    pub id: String,
    pub star_rating: StarRating,
    pub comment: String,
    pub reviewer_name: String,
    pub created_at: DateTime<Utc>,
    pub has_existing_reply: bool,
}

impl Review {
    pub fn new(
        id: impl Into<String>,
        star_rating: StarRating,
        comment: impl Into<String>,
        reviewer_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            star_rating,
            comment: comment.into(),
            reviewer_name: reviewer_name.into(),
            created_at,
            has_existing_reply: false,
        }
    }

    pub fn with_existing_reply(mut self, has_reply: bool) -> Self {
        self.has_existing_reply = has_reply;
        self
    }

    /// First word of the reviewer's display name, or `"there"` when anonymous.
    pub fn first_name(&self) -> &str {
        let name = self.reviewer_name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("anonymous") {
            return "there";
        }
        name.split_whitespace().next().unwrap_or("there")
    }
}
