//! Confirmation store: drafted replies waiting for a YES/NO from the operator,
//! keyed by short codes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::WorkflowError;

/// Length of a confirmation code.
pub const CODE_LEN: usize = 6;

/// Default cap on simultaneously pending confirmations.
pub const DEFAULT_MAX_PENDING: usize = 500;

/// Attempts at finding an unused code before giving up.
const MAX_CODE_ATTEMPTS: usize = 16;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A drafted reply awaiting a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub code: String,
    pub review_id: String,
    pub draft_text: String,
    pub created_at: DateTime<Utc>,
}

/// Source of candidate codes. Uniqueness is checked by the store, not here.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random `[A-Z0-9]{6}` codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

/// True if `code` has the confirmation-code shape (case-insensitive).
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.chars().all(|c| c.is_ascii_alphanumeric())
}

struct Entry {
    confirmation: PendingConfirmation,
    /// Insertion order, for evicting the oldest entry.
    seq: u64,
}

/// Short-code keyed map of pending confirmations.
///
/// Not internally synchronized; the workflow engine serializes access
/// through its workflow lock, which makes [`ConfirmationStore::resolve`] the
/// single point where a code is claimed.
pub struct ConfirmationStore {
    entries: HashMap<String, Entry>,
    generator: Box<dyn CodeGenerator>,
    max_pending: usize,
    next_seq: u64,
}

impl Default for ConfirmationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationStore {
    pub fn new() -> Self {
        Self::with_generator(Box::new(RandomCodeGenerator), DEFAULT_MAX_PENDING)
    }

    pub fn with_generator(generator: Box<dyn CodeGenerator>, max_pending: usize) -> Self {
        Self {
            entries: HashMap::new(),
            generator,
            max_pending: max_pending.max(1),
            next_seq: 0,
        }
    }

    /// Store a new draft and return its code.
    ///
    /// Any confirmation still pending for the same review is superseded. If
    /// the store is full, the oldest pending confirmation is evicted.
    pub fn create(&mut self, review_id: &str, draft_text: &str) -> Result<String, WorkflowError> {
        let code = self.fresh_code()?;

        let superseded: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.confirmation.review_id == review_id)
            .map(|(code, _)| code.clone())
            .collect();
        for old in superseded {
            self.entries.remove(&old);
            info!(code = %old, review_id, "Confirmation superseded by a newer draft");
        }

        while self.entries.len() >= self.max_pending {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(code, _)| code.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
            warn!(code = %oldest, max = self.max_pending, "Confirmation store full, evicted oldest");
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            code.clone(),
            Entry {
                confirmation: PendingConfirmation {
                    code: code.clone(),
                    review_id: review_id.to_string(),
                    draft_text: draft_text.to_string(),
                    created_at: Utc::now(),
                },
                seq,
            },
        );

        debug!(code = %code, review_id, pending = self.entries.len(), "Confirmation created");
        Ok(code)
    }

    /// Remove and return the confirmation for `code`, if still pending.
    pub fn resolve(&mut self, code: &str) -> Option<PendingConfirmation> {
        self.entries
            .remove(&code.to_ascii_uppercase())
            .map(|e| e.confirmation)
    }

    /// Remove the confirmation for `code` without acting on it.
    pub fn cancel(&mut self, code: &str) -> bool {
        self.resolve(code).is_some()
    }

    /// Look without removing.
    pub fn get(&self, code: &str) -> Option<&PendingConfirmation> {
        self.entries
            .get(&code.to_ascii_uppercase())
            .map(|e| &e.confirmation)
    }

    /// All pending confirmations, oldest first.
    pub fn pending(&self) -> Vec<PendingConfirmation> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.confirmation.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh_code(&self) -> Result<String, WorkflowError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = self.generator.generate().to_ascii_uppercase();
            if !is_valid_code(&code) {
                warn!(attempt, "Code generator produced a malformed code");
                continue;
            }
            if self.entries.contains_key(&code) {
                debug!(attempt, "Confirmation code collision, retrying");
                continue;
            }
            return Ok(code);
        }
        Err(WorkflowError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }
}
