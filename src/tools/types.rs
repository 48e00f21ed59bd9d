//! Tool call and tool result types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// A request to invoke one named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Registered tool name
    pub name: String,

    /// Structured argument handed to the tool as a single value
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolSpec {
    /// Tool call with a structured argument
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Tool call with no arguments
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }
}

/// Normalized outcome of a tool invocation
///
/// `result` is meaningful when `ok` is true, `error` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool name that was requested
    pub tool: String,

    /// Whether the invocation succeeded
    pub ok: bool,

    /// Return value of the tool
    pub result: Option<Value>,

    /// Failure description
    pub error: Option<String>,

    /// Wall-clock duration in seconds (successful calls)
    pub duration: Option<f64>,

    /// Diagnostic trace captured when the tool raised
    pub traceback: Option<String>,
}

impl ToolResult {
    /// Create successful result
    pub fn success(tool: impl Into<String>, result: Value, duration: Duration) -> Self {
        Self {
            tool: tool.into(),
            ok: true,
            result: Some(result),
            error: None,
            duration: Some(duration.as_secs_f64()),
            traceback: None,
        }
    }

    /// Create failed result
    pub fn failure(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            ok: false,
            result: None,
            error: Some(error.into()),
            duration: None,
            traceback: None,
        }
    }

    /// Attach a diagnostic trace
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// Result for a name with no registered tool
    pub fn not_registered(tool: &str) -> Self {
        Self::failure(tool, format!("no registered tool '{}'", tool))
    }

    /// Result for a call that exceeded its wait bound
    pub fn timed_out(tool: &str, timeout: Duration) -> Self {
        Self::failure(
            tool,
            format!(
                "tool '{}' timed out after {:?} seconds",
                tool,
                timeout.as_secs_f64()
            ),
        )
    }

    /// Result for a tool that returned an error or panicked
    pub fn raised(tool: &str, message: impl std::fmt::Display) -> Self {
        Self::failure(
            tool,
            format!("tool '{}' raised an exception: {}", tool, message),
        )
    }
}

/// Tool execution statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolStats {
    /// Total executions (registered tools only)
    pub total_executions: u64,

    /// Successful executions
    pub successful_executions: u64,

    /// Failed executions, timeouts included
    pub failed_executions: u64,

    /// Executions that hit their timeout
    pub timed_out_executions: u64,

    /// Total execution time of successful calls (ms)
    pub total_duration_ms: u64,
}

impl ToolStats {
    /// Record successful execution
    pub fn record_success(&mut self, duration: Duration) {
        self.total_executions += 1;
        self.successful_executions += 1;
        self.total_duration_ms += duration.as_millis() as u64;
    }

    /// Record failed execution
    pub fn record_failure(&mut self) {
        self.total_executions += 1;
        self.failed_executions += 1;
    }

    /// Record timed out execution
    pub fn record_timeout(&mut self) {
        self.record_failure();
        self.timed_out_executions += 1;
    }

    /// Average duration of successful calls
    pub fn average_duration_ms(&self) -> f64 {
        if self.successful_executions == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.successful_executions as f64
        }
    }

    /// Calculate success rate
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64
        }
    }
}
