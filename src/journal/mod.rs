//! Append-only interaction journal.
//!
//! Every check invocation is recorded as one JSON line: timestamp,
//! operation, domain, duration, and a compact summary of the result. The
//! journal is an audit artifact, so writes are best-effort — a failed append
//! is logged and dropped rather than failing the check that produced it.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::warn;
use serde::Serialize;

/// One journal line: what ran, against what, and how it went.
#[derive(Debug, Serialize)]
pub struct InvocationEvent {
    /// Wall-clock time of completion (epoch milliseconds).
    pub ts_ms: i64,
    /// Operation name (`health_check`, `mail_policy_check`, ...).
    pub operation: &'static str,
    /// The domain that was checked.
    pub domain: String,
    /// How long the check took.
    pub duration_ms: u64,
    /// Compact result summary (finding counts and headline values).
    pub summary: serde_json::Value,
}

impl InvocationEvent {
    /// Builds an event stamped with the current time.
    pub fn now(
        operation: &'static str,
        domain: &str,
        duration_ms: u64,
        summary: serde_json::Value,
    ) -> Self {
        InvocationEvent {
            ts_ms: chrono::Utc::now().timestamp_millis(),
            operation,
            domain: domain.to_string(),
            duration_ms,
            summary,
        }
    }
}

/// Destination for invocation events.
///
/// Injected into the evaluator so tests and embedders can capture or discard
/// events without touching the filesystem.
pub trait EventSink: Send + Sync {
    /// Records one event. Implementations must not panic on failure.
    fn record(&self, event: &InvocationEvent);
}

/// Journal that appends one JSON line per event to a file.
pub struct JsonlJournal {
    file: Mutex<File>,
}

impl JsonlJournal {
    /// Opens (or creates) the journal file for appending.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(JsonlJournal {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for JsonlJournal {
    fn record(&self, event: &InvocationEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("journal: could not serialize event: {}", e);
                return;
            }
        };
        // A poisoned lock means another append panicked; skip this line.
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        if let Err(e) = writeln!(file, "{}", line) {
            warn!("journal: append failed: {}", e);
        }
    }
}

/// Sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &InvocationEvent) {}
}

/// Sink that keeps serialized events in memory, for tests.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<serde_json::Value>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &InvocationEvent) {
        if let Ok(value) = serde_json::to_value(event) {
            if let Ok(mut events) = self.events.lock() {
                events.push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_journal_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = JsonlJournal::open(&path).unwrap();

        journal.record(&InvocationEvent::now(
            "health_check",
            "example.com",
            42,
            serde_json::json!({ "findings": 0 }),
        ));
        journal.record(&InvocationEvent::now(
            "mail_policy_check",
            "example.com",
            7,
            serde_json::json!({ "findings": 1 }),
        ));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["operation"], "health_check");
        assert_eq!(first["domain"], "example.com");
        assert_eq!(first["duration_ms"], 42);
        assert!(first["ts_ms"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_jsonl_journal_reopens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        {
            let journal = JsonlJournal::open(&path).unwrap();
            journal.record(&InvocationEvent::now(
                "dnssec_status",
                "a.example",
                1,
                serde_json::json!({}),
            ));
        }
        {
            let journal = JsonlJournal::open(&path).unwrap();
            journal.record(&InvocationEvent::now(
                "dnssec_status",
                "b.example",
                1,
                serde_json::json!({}),
            ));
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_memory_sink_captures_events() {
        let sink = MemorySink::new();
        sink.record(&InvocationEvent::now(
            "health_check",
            "example.com",
            3,
            serde_json::json!({ "error": 0 }),
        ));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["operation"], "health_check");
    }

    #[test]
    fn test_null_sink_is_silent() {
        NullSink.record(&InvocationEvent::now(
            "propagation_check",
            "example.com",
            0,
            serde_json::json!({}),
        ));
    }
}
