//! Lifecycle events and the sinks that receive them.
//!
//! Every execution produces a fixed sequence of events: `system`, `prompt`,
//! then exactly one of `response` or `error`. Sinks are invoked synchronously
//! at each point; where the events end up is the sink's business.

use crate::types::{RequestConfig, RequestPayload};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Event kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    System,
    Prompt,
    Response,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::System => "system",
            EventKind::Prompt => "prompt",
            EventKind::Response => "response",
            EventKind::Error => "error",
        }
    }
}

/// Outcome marker carried by error events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Failed,
}

/// Metadata attached to a successful response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionMetadata {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RequestConfig>,
}

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelEvent {
    System {
        execution_id: Uuid,
        model: String,
        system_template: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        config: Option<RequestConfig>,
    },
    Prompt {
        execution_id: Uuid,
        model: String,
        #[serde(flatten)]
        payload: RequestPayload,
        #[serde(skip_serializing_if = "Option::is_none")]
        config: Option<RequestConfig>,
    },
    Response {
        execution_id: Uuid,
        model: String,
        response: serde_json::Value,
        execution_metadata: ExecutionMetadata,
    },
    Error {
        execution_id: Uuid,
        model: String,
        error: String,
        status: ExecutionStatus,
    },
}

impl ModelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ModelEvent::System { .. } => EventKind::System,
            ModelEvent::Prompt { .. } => EventKind::Prompt,
            ModelEvent::Response { .. } => EventKind::Response,
            ModelEvent::Error { .. } => EventKind::Error,
        }
    }

    /// Model identifier the event refers to
    pub fn model(&self) -> &str {
        match self {
            ModelEvent::System { model, .. }
            | ModelEvent::Prompt { model, .. }
            | ModelEvent::Response { model, .. }
            | ModelEvent::Error { model, .. } => model,
        }
    }

    /// Execution the event belongs to
    pub fn execution_id(&self) -> Uuid {
        match self {
            ModelEvent::System { execution_id, .. }
            | ModelEvent::Prompt { execution_id, .. }
            | ModelEvent::Response { execution_id, .. }
            | ModelEvent::Error { execution_id, .. } => *execution_id,
        }
    }
}

/// Receiver for lifecycle events.
pub trait LogSink: Send + Sync + Debug {
    /// Record one event. Called synchronously from the pipeline.
    fn record(&self, event: &ModelEvent);
}

/// Sink forwarding events to `tracing`.
///
/// System and prompt events are emitted at `DEBUG`, responses at `INFO` and
/// errors at `ERROR`, all under the `modelgate::interaction` target.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn record(&self, event: &ModelEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => format!("<unserializable event: {}>", e),
        };
        let kind = event.kind().as_str();
        let model = event.model();
        let execution_id = event.execution_id();

        match event.kind() {
            EventKind::System | EventKind::Prompt => tracing::debug!(
                target: "modelgate::interaction",
                kind,
                model,
                %execution_id,
                %payload,
                "model interaction"
            ),
            EventKind::Response => tracing::info!(
                target: "modelgate::interaction",
                kind,
                model,
                %execution_id,
                %payload,
                "model interaction"
            ),
            EventKind::Error => tracing::error!(
                target: "modelgate::interaction",
                kind,
                model,
                %execution_id,
                %payload,
                "model interaction"
            ),
        }
    }
}

/// Sink keeping every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ModelEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<ModelEvent> {
        self.lock().clone()
    }

    /// Kinds of the recorded events, in order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().iter().map(ModelEvent::kind).collect()
    }

    /// Events belonging to one execution, in order
    pub fn events_for(&self, execution_id: Uuid) -> Vec<ModelEvent> {
        self.lock()
            .iter()
            .filter(|e| e.execution_id() == execution_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ModelEvent>> {
        // Events are append-only, so a poisoned lock still holds a valid log.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LogSink for MemorySink {
    fn record(&self, event: &ModelEvent) {
        self.lock().push(event.clone());
    }
}

/// Sink fanning out to several sinks in order
#[derive(Debug, Clone, Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LogSink for MultiSink {
    fn record(&self, event: &ModelEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
