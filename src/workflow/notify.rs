//! Operator notifications and their SMS text.
//!
//! The engine decides *what* to tell the operator as [`Notification`] values;
//! [`NotificationFormatter`] turns them into message bodies. Formatting never
//! touches workflow state.

use crate::reviews::Review;

/// Comment length shown in a daily review prompt.
const PROMPT_COMMENT_CHARS: usize = 150;

/// Comment length shown in a reply confirmation request.
const CONFIRMATION_COMMENT_CHARS: usize = 100;

/// Something the operator should be told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Daily run found nothing unanswered.
    CaughtUp,
    /// Digest of the reviews in this run.
    Summary { summary: String },
    /// Queue populated; prompts follow.
    RunStarted {
        total: usize,
        new_count: usize,
        carried_over: usize,
    },
    /// Ask about one review. `position` is 1-based.
    ReviewPrompt {
        review: Review,
        position: usize,
        total: usize,
    },
    /// Every review in the queue has been acted on.
    RunComplete,
    /// Drafted reply awaiting YES/NO.
    ReplyConfirmation {
        review: Review,
        draft: String,
        code: String,
    },
    InvalidReviewNumber { n: usize },
    Skipped { n: usize },
    ReplySubmitted { code: String },
    ReplyFailed { code: String },
    ConfirmationNotFound { code: String },
    ReplyCancelled { code: String },
    CancelNotFound { code: String },
    DraftFailed { n: usize },
    DailyRunFailed,
}

/// Renders [`Notification`]s as SMS bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotificationFormatter;

impl NotificationFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, notification: &Notification) -> String {
        match notification {
            Notification::CaughtUp => {
                "✅ All reviews have been replied to! No action needed.".to_string()
            }
            Notification::Summary { summary } => {
                format!("📊 Google Reviews Summary:\n\n{summary}")
            }
            Notification::RunStarted {
                total,
                new_count,
                carried_over,
            } => format!(
                "📝 Found {total} review(s) that need replies ({new_count} new, {carried_over} carried over). Starting individual review process..."
            ),
            Notification::ReviewPrompt {
                review,
                position,
                total,
            } => format!(
                "📝 Daily Review {position}/{total}\n\n\
                 ⭐ RATING: {stars} ({rating})\n\
                 👤 CUSTOMER: {customer}\n\
                 💬 REVIEW: \"{comment}\"\n\n\
                 Want to reply to this review?\n\
                 📱 Text REPLY{position} to generate a response\n\
                 ⏭️ Text SKIP{position} to skip this one",
                stars = review.star_rating.stars(),
                rating = review.star_rating,
                customer = display_name(review),
                comment = excerpt(&review.comment, PROMPT_COMMENT_CHARS),
            ),
            Notification::RunComplete => {
                "✅ Daily review workflow complete! All reviews processed.".to_string()
            }
            Notification::ReplyConfirmation {
                review,
                draft,
                code,
            } => format!(
                "🤖 Review Reply Request #{code}\n\n\
                 📋 REVIEW:\n\
                 Rating: {stars} ({rating})\n\
                 Customer: {customer}\n\
                 Review: \"{comment}\"\n\n\
                 💬 SUGGESTED REPLY:\n\
                 \"{draft}\"\n\n\
                 Reply with:\n\
                 ✅ YES{code} to send\n\
                 ❌ NO{code} to cancel",
                stars = review.star_rating.stars(),
                rating = review.star_rating,
                customer = display_name(review),
                comment = excerpt(&review.comment, CONFIRMATION_COMMENT_CHARS),
            ),
            Notification::InvalidReviewNumber { n } => format!("❌ Invalid review number: {n}"),
            Notification::Skipped { n } => format!("⏭️ Skipped review {n}"),
            Notification::ReplySubmitted { code } => {
                format!("✅ Reply submitted successfully for confirmation #{code}")
            }
            Notification::ReplyFailed { code } => format!(
                "❌ Failed to submit reply for confirmation #{code}. Text REPLY with the review number to draft it again."
            ),
            Notification::ConfirmationNotFound { code } => {
                format!("❌ Confirmation #{code} not found or expired")
            }
            Notification::ReplyCancelled { code } => {
                format!("❌ Reply cancelled for confirmation #{code}")
            }
            Notification::CancelNotFound { code } => format!("❌ Confirmation #{code} not found"),
            Notification::DraftFailed { n } => {
                format!("❌ Couldn't draft a reply for review {n}. Please try again.")
            }
            Notification::DailyRunFailed => {
                "❌ Error running daily review check. Please check the app.".to_string()
            }
        }
    }
}

fn display_name(review: &Review) -> &str {
    let name = review.reviewer_name.trim();
    if name.is_empty() { "Anonymous" } else { name }
}

/// First `max_chars` characters of `comment` with `...` appended when cut,
/// or `No comment` when empty.
fn excerpt(comment: &str, max_chars: usize) -> String {
    if comment.is_empty() {
        return "No comment".to_string();
    }
    match comment.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &comment[..cut]),
        None => comment.to_string(),
    }
}
