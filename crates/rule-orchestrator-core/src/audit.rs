// crates/rule-orchestrator-core/src/audit.rs
// ============================================================================
// Module: Engine Event Logging
// Description: Structured events for parsing, hierarchy, and sync activity.
// Purpose: Emit JSON-lines logs without binding to a logging backend.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Components report noteworthy activity (skipped files, parse issues,
//! dependency cycles, auth decisions, rate limiting, sync completion) as
//! [`EngineEvent`] values routed to an [`EventSink`]. Sinks serialize events
//! as one JSON object per line so deployments can forward them to whatever
//! pipeline they already run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;

use serde::Serialize;

use crate::core::time::format_millis;
use crate::core::time::system_time_millis;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity of an engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Routine activity.
    Info,
    /// Degraded but recovered.
    Warn,
    /// Operation failed.
    Error,
}

/// Structured engine event payload.
#[derive(Debug, Clone, Serialize)]
pub struct EngineEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Event timestamp rendered as RFC 3339 UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Severity.
    pub level: EventLevel,
    /// Rule path involved, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Client involved, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Sync request involved, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl EngineEvent {
    /// Creates an event stamped with the current wall-clock time.
    #[must_use]
    pub fn new(event: &'static str, level: EventLevel, message: impl Into<String>) -> Self {
        Self::at(event, level, system_time_millis(SystemTime::now()), message)
    }

    /// Creates an event stamped with an explicit unix-millisecond time.
    #[must_use]
    pub fn at(
        event: &'static str,
        level: EventLevel,
        timestamp_ms: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event,
            timestamp_ms,
            timestamp: format_millis(timestamp_ms),
            level,
            path: None,
            client_id: None,
            request_id: None,
            message: message.into(),
        }
    }

    /// Attaches a rule path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches a client identifier.
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Attaches a request identifier.
    #[must_use]
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for engine events.
pub trait EventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &EngineEvent);
}

/// Shared sink handle.
pub type SharedEventSink = Arc<dyn EventSink>;

/// Sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &EngineEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &EngineEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that discards events.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &EngineEvent) {}
}

/// Sink that keeps events in memory, for embedding hosts and tests.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<EngineEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Counts recorded events with the given identifier.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .map(|guard| guard.iter().filter(|recorded| recorded.event == event).count())
            .unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &EngineEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
