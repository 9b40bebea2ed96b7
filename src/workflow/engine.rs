//! Workflow engine: the review outreach state machine.
//!
//! Each entry point performs one transition and returns the notifications it
//! produced; the `trigger_*`/`on_*` wrappers also deliver them in order.
//! Queue and confirmation mutations happen under a single workflow lock.
//! Collaborators (review source, drafter, summarizer, notifier, checkpoint
//! store) are always called with the lock released.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::channels::{MessageId, Notifier, is_sender_allowed};
use crate::drafting::{ReplyDrafter, Summarizer};
use crate::error::{self, SourceError, WorkflowError};
use crate::reviews::{Review, ReviewSource};
use crate::store::CheckpointStore;
use crate::workflow::command::{Command, CommandParser};
use crate::workflow::confirmations::{ConfirmationStore, PendingConfirmation};
use crate::workflow::notify::{Notification, NotificationFormatter};
use crate::workflow::state::{RunInfo, RunPhase, WorkflowRunState, WorkflowStatus};

/// Collaborators the engine drives.
///
/// Bundles the shared components to reduce argument count.
pub struct WorkflowDeps {
    pub source: Arc<dyn ReviewSource>,
    pub summarizer: Arc<dyn Summarizer>,
    pub drafter: Arc<dyn ReplyDrafter>,
    pub notifier: Arc<dyn Notifier>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

/// Result of the explicit generate-reply action.
#[derive(Debug, Clone)]
pub struct GeneratedReply {
    pub code: String,
    pub draft: String,
    pub review: Review,
}

/// The review outreach state machine.
pub struct WorkflowEngine {
    deps: WorkflowDeps,
    formatter: NotificationFormatter,
    allowed_senders: Vec<String>,
    state: Mutex<WorkflowRunState>,
}

impl WorkflowEngine {
    pub fn new(deps: WorkflowDeps) -> Self {
        Self::with_confirmations(deps, ConfirmationStore::new())
    }

    pub fn with_confirmations(deps: WorkflowDeps, confirmations: ConfirmationStore) -> Self {
        Self {
            deps,
            formatter: NotificationFormatter::new(),
            allowed_senders: vec!["*".to_string()],
            state: Mutex::new(WorkflowRunState::new(confirmations)),
        }
    }

    /// Restrict who may send commands. See [`is_sender_allowed`].
    pub fn with_allowed_senders(mut self, senders: Vec<String>) -> Self {
        self.allowed_senders = senders;
        self
    }

    pub async fn phase(&self) -> RunPhase {
        self.state.lock().await.phase()
    }

    pub async fn status(&self) -> WorkflowStatus {
        WorkflowStatus::from(&*self.state.lock().await)
    }

    // ── Daily run ───────────────────────────────────────────────────

    /// Run the daily check and deliver its notifications.
    pub async fn trigger_daily_run(&self) -> WorkflowStatus {
        let notifications = self.start_daily_run().await;
        self.deliver(&notifications).await;
        self.status().await
    }

    /// Fetch, summarize, and queue unanswered reviews for a new run.
    ///
    /// The checkpoint is taken when the run starts, so reviews arriving
    /// mid-run count as new next time. Any collaborator failure before the
    /// queue is replaced leaves state untouched.
    pub async fn start_daily_run(&self) -> Vec<Notification> {
        let started_at = Utc::now();
        info!("Starting daily review run");

        match self.collect_run(started_at).await {
            Ok(notifications) => notifications,
            Err(e) => {
                error!(error = %e, "Daily review run failed");
                vec![Notification::DailyRunFailed]
            }
        }
    }

    async fn collect_run(
        &self,
        started_at: DateTime<Utc>,
    ) -> Result<Vec<Notification>, WorkflowError> {
        let since = self
            .deps
            .checkpoints
            .get_last_checkpoint()
            .await
            .map_err(|e| WorkflowError::collaborator("get_last_checkpoint", e))?;

        let (new, all) = self
            .deps
            .source
            .fetch_new_and_all(since)
            .await
            .map_err(|e| WorkflowError::collaborator("fetch_unanswered", e))?;

        if all.is_empty() {
            self.state
                .lock()
                .await
                .begin_run(RunInfo::new(started_at, 0, 0), Vec::new());
            self.save_checkpoint(started_at).await;
            info!("No unanswered reviews");
            return Ok(vec![Notification::CaughtUp]);
        }

        let summary = self
            .deps
            .summarizer
            .summarize(&all)
            .await
            .map_err(|e| WorkflowError::collaborator("summarize", e))?;

        let new_ids: HashSet<&str> = new.iter().map(|r| r.id.as_str()).collect();
        let total = all.len();
        let new_count = all
            .iter()
            .filter(|r| new_ids.contains(r.id.as_str()))
            .count();
        let carried_over = total - new_count;

        let run = RunInfo::new(started_at, new_count, carried_over);
        let run_id = run.id;
        let first_prompt = {
            let mut state = self.state.lock().await;
            state.begin_run(run, all);
            Self::next_prompt(&state)
        };
        self.save_checkpoint(started_at).await;

        info!(run_id = %run_id, total, new_count, carried_over, "Daily review run started");
        Ok(vec![
            Notification::Summary { summary },
            Notification::RunStarted {
                total,
                new_count,
                carried_over,
            },
            first_prompt,
        ])
    }

    async fn save_checkpoint(&self, at: DateTime<Utc>) {
        if let Err(e) = self.deps.checkpoints.set_last_checkpoint(at).await {
            error!(error = %e, "Failed to save checkpoint; next run will re-count these reviews as new");
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Parse and handle one inbound message, then deliver the outcome.
    ///
    /// Messages from senders outside the allow-list are dropped.
    pub async fn on_inbound_message(&self, text: &str, sender: &str) -> Vec<Notification> {
        if !is_sender_allowed(&self.allowed_senders, sender) {
            warn!(sender, "Ignoring message from unknown sender");
            return Vec::new();
        }

        let command = CommandParser::parse(text);
        info!(sender, command = ?command, "Inbound command");
        let notifications = self.handle(command).await;
        self.deliver(&notifications).await;
        notifications
    }

    /// Apply one command. Never fails; errors become notifications.
    pub async fn handle(&self, command: Command) -> Vec<Notification> {
        match command {
            Command::GenerateForIndex { n } => match self.generate_for_index(n).await {
                Ok(notification) => vec![notification],
                Err(WorkflowError::IndexOutOfRange { number, len }) => {
                    debug!(number, len, "REPLY for a review outside the queue");
                    vec![Notification::InvalidReviewNumber { n }]
                }
                Err(e) => {
                    error!(n, error = %e, "Drafting reply failed");
                    vec![Notification::DraftFailed { n }]
                }
            },
            Command::SkipIndex { n } => self.skip_index(n).await,
            Command::ConfirmReply { code } => self.confirm_reply(code).await,
            Command::CancelReply { code } => {
                let cancelled = self.state.lock().await.confirmations.cancel(&code);
                if cancelled {
                    info!(code = %code, "Reply cancelled");
                    vec![Notification::ReplyCancelled { code }]
                } else {
                    vec![Notification::CancelNotFound { code }]
                }
            }
            Command::Unrecognized { raw } => {
                debug!(raw = %raw, "Ignoring unrecognized command");
                Vec::new()
            }
        }
    }

    /// `REPLY<n>`: draft for the n-th review. The cursor does not move.
    async fn generate_for_index(&self, n: usize) -> Result<Notification, WorkflowError> {
        let review = {
            let state = self.state.lock().await;
            n.checked_sub(1)
                .and_then(|i| state.queue.get(i))
                .cloned()
                .ok_or_else(|| WorkflowError::IndexOutOfRange {
                    number: n,
                    len: state.queue.len(),
                })?
        };

        let draft = self
            .deps
            .drafter
            .draft_reply(&review)
            .await
            .map_err(|e| WorkflowError::collaborator("draft_reply", e))?;

        let code = self
            .state
            .lock()
            .await
            .confirmations
            .create(&review.id, &draft)?;

        info!(code = %code, review_id = %review.id, n, "Reply drafted");
        Ok(Notification::ReplyConfirmation {
            review,
            draft,
            code,
        })
    }

    /// `SKIP<n>`: move past the n-th review and prompt for the next one.
    async fn skip_index(&self, n: usize) -> Vec<Notification> {
        let mut state = self.state.lock().await;
        let advanced = match n.checked_sub(1) {
            Some(index) => state.queue.advance_to(index),
            None => Err(WorkflowError::IndexOutOfRange {
                number: n,
                len: state.queue.len(),
            }),
        };
        if let Err(e) = advanced {
            debug!(error = %e, "SKIP rejected");
            return vec![Notification::InvalidReviewNumber { n }];
        }

        debug!(n, position = state.queue.position(), "Review skipped");
        vec![Notification::Skipped { n }, Self::next_prompt(&state)]
    }

    /// `YES<code>`: claim the confirmation, then submit it.
    ///
    /// A failed submission does not restore the confirmation; the operator
    /// drafts again with `REPLY<n>`.
    async fn confirm_reply(&self, code: String) -> Vec<Notification> {
        let pending = match self.claim(&code).await {
            Ok(pending) => pending,
            Err(e) => {
                info!(error = %e, "YES for unknown code");
                return vec![Notification::ConfirmationNotFound { code }];
            }
        };

        match self
            .deps
            .source
            .submit_reply(&pending.review_id, &pending.draft_text)
            .await
        {
            Ok(()) => {
                info!(code = %pending.code, review_id = %pending.review_id, "Reply submitted");
                vec![Notification::ReplySubmitted { code: pending.code }]
            }
            Err(e) => {
                let err = WorkflowError::collaborator("submit_reply", e);
                error!(code = %pending.code, review_id = %pending.review_id, error = %err, "Reply submission failed");
                vec![Notification::ReplyFailed { code: pending.code }]
            }
        }
    }

    /// Atomically remove a pending confirmation. Exactly one caller wins.
    async fn claim(&self, code: &str) -> Result<PendingConfirmation, WorkflowError> {
        self.state
            .lock()
            .await
            .confirmations
            .resolve(code)
            .ok_or_else(|| WorkflowError::ConfirmationNotFound {
                code: code.to_string(),
            })
    }

    fn next_prompt(state: &WorkflowRunState) -> Notification {
        match state.queue.current() {
            Some(review) => Notification::ReviewPrompt {
                review: review.clone(),
                position: state.queue.position() + 1,
                total: state.queue.len(),
            },
            None => Notification::RunComplete,
        }
    }

    // ── Direct actions (HTTP) ───────────────────────────────────────

    /// Draft a reply for a review by id and send the confirmation request.
    ///
    /// `review_id` is either the full resource name or its last path segment.
    pub async fn generate_reply_for_review(
        &self,
        review_id: &str,
    ) -> error::Result<GeneratedReply> {
        let review = self.find_unanswered(review_id).await?;

        let draft = self.deps.drafter.draft_reply(&review).await?;
        let code = self
            .state
            .lock()
            .await
            .confirmations
            .create(&review.id, &draft)?;
        info!(code = %code, review_id, "Reply drafted on request");

        self.deliver(&[Notification::ReplyConfirmation {
            review: review.clone(),
            draft: draft.clone(),
            code: code.clone(),
        }])
        .await;

        Ok(GeneratedReply {
            code,
            draft,
            review,
        })
    }

    /// Look up an unanswered review by full resource name or last path segment.
    async fn find_unanswered(&self, review_id: &str) -> error::Result<Review> {
        let reviews = self.deps.source.fetch_unanswered(None).await?;
        Ok(reviews
            .into_iter()
            .find(|r| matches_review_id(r, review_id))
            .ok_or_else(|| SourceError::ReviewNotFound(review_id.to_string()))?)
    }

    pub async fn unanswered_reviews(&self) -> error::Result<Vec<Review>> {
        Ok(self.deps.source.fetch_unanswered(None).await?)
    }

    pub async fn summarize_unanswered(&self) -> error::Result<String> {
        let reviews = self.deps.source.fetch_unanswered(None).await?;
        Ok(self.deps.summarizer.summarize(&reviews).await?)
    }

    /// Summarize and text the summary to the operator.
    pub async fn send_summary(&self) -> error::Result<String> {
        let summary = self.summarize_unanswered().await?;
        let text = self.formatter.render(&Notification::Summary {
            summary: summary.clone(),
        });
        self.deps.notifier.send(&text).await?;
        Ok(summary)
    }

    /// Post a reply without going through a confirmation.
    ///
    /// Full resource names are posted as given; a bare review id is looked up
    /// among the unanswered reviews first.
    pub async fn submit_direct_reply(&self, review_id: &str, text: &str) -> error::Result<()> {
        let review_id = if review_id.contains('/') {
            review_id.to_string()
        } else {
            self.find_unanswered(review_id).await?.id
        };
        self.deps.source.submit_reply(&review_id, text).await?;
        info!(review_id = %review_id, "Direct reply submitted");
        Ok(())
    }

    pub async fn send_text(&self, text: &str) -> error::Result<MessageId> {
        Ok(self.deps.notifier.send(text).await?)
    }

    /// Send notifications in order. Failures are logged and not retried.
    pub async fn deliver(&self, notifications: &[Notification]) {
        for notification in notifications {
            let text = self.formatter.render(notification);
            match self.deps.notifier.send(&text).await {
                Ok(id) => debug!(message_id = %id, "Notification sent"),
                Err(e) => warn!(
                    channel = self.deps.notifier.name(),
                    error = %e,
                    "Failed to send notification"
                ),
            }
        }
    }
}

fn matches_review_id(review: &Review, review_id: &str) -> bool {
    review.id == review_id || review.id.rsplit('/').next() == Some(review_id)
}
