//! Review outreach workflow: queue, confirmations, command parsing, engine.

pub mod command;
pub mod confirmations;
pub mod engine;
pub mod notify;
pub mod queue;
pub mod state;

pub use command::{Command, CommandParser};
pub use confirmations::{
    CodeGenerator, ConfirmationStore, PendingConfirmation, RandomCodeGenerator,
};
pub use engine::{GeneratedReply, WorkflowDeps, WorkflowEngine};
pub use notify::{Notification, NotificationFormatter};
pub use queue::ReviewQueue;
pub use state::{RunPhase, WorkflowRunState, WorkflowStatus};
