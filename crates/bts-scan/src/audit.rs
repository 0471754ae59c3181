//! Audit event sink
//!
//! The orchestrator reports scan start, stop, completion and failure as
//! `(category, event type, description)` triples. It never reads them back.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;

/// Receiver of audit events
pub trait AuditSink: Send + Sync {
    /// Record one event
    fn record(&self, category: &str, event_type: &str, description: &str);
}

/// Sink that emits events through `tracing` on the `audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, category: &str, event_type: &str, description: &str) {
        info!(target: "audit", category, event_type, "{}", description);
    }
}

/// A recorded audit event
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub category: String,
    pub event_type: String,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// Sink that keeps events in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Event types recorded so far, oldest first
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, category: &str, event_type: &str, description: &str) {
        self.events.lock().push(AuditEvent {
            category: category.to_string(),
            event_type: event_type.to_string(),
            description: description.to_string(),
            recorded_at: Utc::now(),
        });
    }
}
