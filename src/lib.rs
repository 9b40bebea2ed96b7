//! Review Outreach: daily review digests and SMS-approved replies.

pub mod channels;
pub mod config;
pub mod drafting;
pub mod error;
pub mod reviews;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod workflow;
