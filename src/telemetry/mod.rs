//! Trace events for runs
//!
//! Append-only product records, one `{ts, event, payload}` per emit. These
//! are separate from diagnostics logging (`tracing`), which is controlled by
//! `RUST_LOG` and never persisted.

use crate::checkpoint::validate_run_id;
use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default directory for trace files
pub const DEFAULT_TRACE_DIR: &str = ".traces";

/// Event names emitted by the kernel
pub mod events {
    pub const RUN_START: &str = "run_start";
    pub const STAGE_ENTER: &str = "stage_enter";
    pub const STAGE_COMPLETE: &str = "stage_complete";
    pub const TOOL_RESULT: &str = "tool_result";
    pub const LOGIC_FAILED: &str = "logic_failed";
    pub const RUN_COMPLETE: &str = "run_complete";
}

/// One trace record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub ts: DateTime<Utc>,
    pub event: String,
    pub payload: Value,
}

impl TraceEvent {
    pub fn now(event: impl Into<String>, payload: Value) -> Self {
        Self {
            ts: Utc::now(),
            event: event.into(),
            payload,
        }
    }
}

/// Append-only event sink keyed by run id
pub trait TraceSink: Send + Sync {
    /// Append an event, returning where it was written
    fn emit(&self, run_id: &str, event: &str, payload: Value) -> Result<String>;

    /// All events of a run, in emit order
    fn read(&self, run_id: &str) -> Result<Vec<TraceEvent>>;
}

/// JSON-lines trace files, one per run
#[derive(Debug, Clone)]
pub struct JsonlTraceSink {
    base_path: PathBuf,
}

impl JsonlTraceSink {
    /// Create sink, creating the base directory if needed
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Trace file of a run
    pub fn trace_file(&self, run_id: &str) -> Result<PathBuf> {
        validate_run_id(run_id)?;
        Ok(self.base_path.join(format!("{}.trace.jsonl", run_id)))
    }
}

impl TraceSink for JsonlTraceSink {
    fn emit(&self, run_id: &str, event: &str, payload: Value) -> Result<String> {
        let path = self.trace_file(run_id)?;
        let line = serde_json::to_string(&TraceEvent::now(event, payload))?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;

        Ok(path.display().to_string())
    }

    fn read(&self, run_id: &str) -> Result<Vec<TraceEvent>> {
        let path = self.trace_file(run_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for line in fs::read_to_string(&path)?.lines().filter(|l| !l.trim().is_empty()) {
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

/// In-memory trace sink
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: Mutex<Vec<(String, TraceEvent)>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get event count across all runs
    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    /// Event names of a run, in emit order
    pub fn event_names(&self, run_id: &str) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(id, _)| id == run_id)
            .map(|(_, event)| event.event.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, TraceEvent)>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TraceSink for MemoryTraceSink {
    fn emit(&self, run_id: &str, event: &str, payload: Value) -> Result<String> {
        let mut events = self.lock();
        events.push((run_id.to_string(), TraceEvent::now(event, payload)));
        Ok(format!("memory://{}#{}", run_id, events.len() - 1))
    }

    fn read(&self, run_id: &str) -> Result<Vec<TraceEvent>> {
        Ok(self
            .lock()
            .iter()
            .filter(|(id, _)| id == run_id)
            .map(|(_, event)| event.clone())
            .collect())
    }
}
