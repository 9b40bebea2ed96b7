//! Template-based reply drafts in a casual owner voice.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::ReplyDrafter;
use crate::error::LlmError;
use crate::reviews::Review;

const POSITIVE_LINES: &[&str] = &[
    "thank you so much! Really appreciate you taking the time to share this.",
    "wow, thank you! Your kind words made our day.",
    "this is amazing feedback - thank you for making our day!",
    "thanks for the love! So glad you enjoyed everything.",
];

const WAIT_ACK: &str = "You're absolutely right about the wait time - we're working on that. ";
const SIGN_OFF: &str = "Hope to see you again soon!";

/// Drafts replies from fixed templates keyed on rating and comment keywords.
#[derive(Debug, Default, Clone)]
pub struct TemplateDrafter;

impl TemplateDrafter {
    pub fn new() -> Self {
        Self
    }

    fn compose(review: &Review, positive_line: &str) -> String {
        let comment = review.comment.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| comment.contains(w));
        let mentions_food = mentions(&["food", "delicious"]);

        let mut reply = format!("Hi {}, ", review.first_name());

        if review.star_rating.get() >= 4 {
            if mentions(&["wait", "slow", "long"]) {
                reply.push_str("thanks for the honest feedback! ");
                reply.push_str(WAIT_ACK);
                if mentions_food {
                    reply.push_str("So glad you still enjoyed the food though! ");
                }
                reply.push_str(SIGN_OFF);
            } else {
                reply.push_str(positive_line);
                if mentions_food {
                    reply.push_str(" So happy you loved the food!");
                }
                reply.push(' ');
                reply.push_str(SIGN_OFF);
            }
        } else {
            reply.push_str("thanks for the honest feedback! ");
            if mentions(&["wait", "slow"]) {
                reply.push_str(WAIT_ACK);
            }
            reply.push_str("Really appreciate you taking the time to help us improve! ");
            reply.push_str(SIGN_OFF);
        }

        reply
    }
}

#[async_trait]
impl ReplyDrafter for TemplateDrafter {
    async fn draft_reply(&self, review: &Review) -> Result<String, LlmError> {
        let line = POSITIVE_LINES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(POSITIVE_LINES[0]);
        Ok(Self::compose(review, line))
    }
}
