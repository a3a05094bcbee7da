//! Processed-request audit records.
//!
//! One write-once record per processed request, keyed by a digest of the
//! serialized request body. The pipeline never reads these back; they exist
//! for diagnostics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::content::ContentShape;

/// Diagnostic record for one processed request.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingSession {
    /// Target model the request was destined for.
    pub model_id: String,
    /// Provider resolved from the model id.
    pub api_provider: String,
    /// Original content shape of each message, by index.
    pub content_shapes: Vec<ContentShape>,
    pub timestamp: DateTime<Utc>,
}

/// Process-wide table of session records, shared across in-flight requests.
#[derive(Debug, Default)]
pub struct SessionTable {
    inner: DashMap<String, ProcessingSession>,
}

impl SessionTable {
    pub fn record(&self, session_id: String, session: ProcessingSession) {
        self.inner.insert(session_id, session);
    }

    pub fn get(&self, session_id: &str) -> Option<ProcessingSession> {
        self.inner.get(session_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
