//! Typed events emitted while a graph runs.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::status::StatusKind;

/// Runtime event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    RunStarted {
        nodes: usize,
        sources: usize,
    },
    NodeReleased {
        node: String,
    },
    NodeStarted {
        node: String,
    },
    NodeCompleted {
        node: String,
        kind: StatusKind,
        code: String,
        iterations: u32,
        duration_ms: u64,
    },
    NodeSkipped {
        node: String,
        reason: String,
    },
    RunFinished {
        kind: StatusKind,
        code: String,
        executed: usize,
        duration_ms: u64,
    },
}

/// Event envelope with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEventEnvelope {
    pub run_id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: RunEvent,
}

/// Receiver of run events. Called from worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, envelope: &RunEventEnvelope);
}

/// Writes every event to the `tracing` debug stream.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, envelope: &RunEventEnvelope) {
        tracing::debug!(run_id = %envelope.run_id, seq = envelope.sequence, event = ?envelope.event, "run event");
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct BufferingEventSink {
    events: RwLock<Vec<RunEventEnvelope>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEventEnvelope> {
        self.events.read().clone()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for BufferingEventSink {
    fn emit(&self, envelope: &RunEventEnvelope) {
        self.events.write().push(envelope.clone());
    }
}

/// Stamps events of one run with its id and a per-run sequence number.
pub(crate) struct Emitter {
    run_id: Uuid,
    sequence: AtomicU64,
    sink: Option<Arc<dyn EventSink>>,
}

impl Emitter {
    pub(crate) fn new(run_id: Uuid, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            run_id,
            sequence: AtomicU64::new(0),
            sink,
        }
    }

    pub(crate) fn emit(&self, event: RunEvent) {
        if let Some(sink) = &self.sink {
            let envelope = RunEventEnvelope {
                run_id: self.run_id,
                sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                timestamp: Utc::now(),
                event,
            };
            sink.emit(&envelope);
        }
    }
}
