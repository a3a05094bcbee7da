//! Progress notification port.
//!
//! The pipeline reports user-visible progress through a one-way sink. Sinks
//! are fire-and-forget with respect to pipeline outcome, but each emission is
//! awaited before processing continues so update ordering matches processing
//! order.

use async_trait::async_trait;
use serde::Serialize;

/// A single user-visible progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub description: String,
    pub done: bool,
}

impl StatusUpdate {
    /// An in-progress update.
    pub fn progress(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: false,
        }
    }

    /// A terminal update.
    pub fn done(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: true,
        }
    }
}

/// Wire envelope for the notification channel:
/// `{"type": "status", "data": {"description": ..., "done": ...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatusEvent {
    Status { data: StatusUpdate },
}

impl From<StatusUpdate> for StatusEvent {
    fn from(data: StatusUpdate) -> Self {
        StatusEvent::Status { data }
    }
}

/// Asynchronous one-way notification sink. No acknowledgment, no return
/// value consumed.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn emit(&self, update: StatusUpdate);
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatusSink;

#[async_trait]
impl StatusSink for NoopStatusSink {
    async fn emit(&self, _update: StatusUpdate) {}
}
