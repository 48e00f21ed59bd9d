//! Tool runner: registry + worker pool + timeout + result normalization
//!
//! `execute` never fails. Unknown names, timeouts, tool errors, panics and a
//! shut-down pool all come back as a [`ToolResult`] with `ok == false`.
//!
//! Each call owns the join handle of its own submission, so a caller only
//! ever sees the result of the tool it asked for.

use crate::tools::pool::{PoolError, WorkerPool, DEFAULT_MAX_WORKERS};
use crate::tools::registry::{FnTool, Tool, ToolRegistry};
use crate::tools::types::{ToolResult, ToolSpec, ToolStats};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default wait bound for one tool call
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs registered tools on a shared worker pool
pub struct ToolRunner {
    /// Tool registry
    registry: ToolRegistry,

    /// Shared worker pool
    pool: Arc<WorkerPool>,

    /// Wait bound used when a call does not specify one
    default_timeout: Duration,

    /// Execution statistics
    stats: Mutex<ToolStats>,
}

impl ToolRunner {
    /// Create a runner on an existing pool
    pub fn new(pool: Arc<WorkerPool>, default_timeout: Duration) -> Self {
        Self {
            registry: ToolRegistry::new(),
            pool,
            default_timeout,
            stats: Mutex::new(ToolStats::default()),
        }
    }

    /// Create a runner with its own pool of `max_workers`
    pub fn with_workers(max_workers: usize, default_timeout: Duration) -> Self {
        Self::new(Arc::new(WorkerPool::new(max_workers)), default_timeout)
    }

    /// Register a tool implementation, replacing any previous one
    pub fn register(&self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        self.registry.register(name, tool);
    }

    /// Register a plain blocking function as a tool
    pub fn register_fn<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.registry.register(name, Arc::new(FnTool::new(func)));
    }

    /// Remove a tool; no-op when absent
    pub fn unregister(&self, name: &str) {
        self.registry.unregister(name);
    }

    /// Execute one tool call, waiting at most `timeout` (or the default)
    pub async fn execute(&self, spec: &ToolSpec, timeout: Option<Duration>) -> ToolResult {
        let name = spec.name.as_str();

        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = %name, "no registered tool");
            return ToolResult::not_registered(name);
        };

        let timeout = timeout.unwrap_or(self.default_timeout);
        let args = spec.args.clone();
        tracing::debug!(tool = %name, timeout_secs = timeout.as_secs_f64(), "dispatching tool");

        let start = Instant::now();
        let submitted = match tool.blocking_body() {
            Some(body) => self.pool.submit_blocking(move || body(args)),
            None => self.pool.submit(async move { tool.call(args).await }),
        };
        let mut handle = match submitted {
            Ok(handle) => handle,
            Err(err) => {
                self.record(|stats| stats.record_failure());
                return ToolResult::failure(name, format!("tool '{}' not started: {}", name, err));
            }
        };

        let result = match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(Ok(Ok(value)))) => {
                let duration = start.elapsed();
                self.record(|stats| stats.record_success(duration));
                return ToolResult::success(name, value, duration);
            }
            Ok(Ok(Ok(Err(err)))) => {
                ToolResult::raised(name, &err).with_traceback(format!("{:?}", err))
            }
            Ok(Ok(Err(PoolError::ShutDown))) => {
                ToolResult::failure(name, format!("tool '{}' not started: {}", name, PoolError::ShutDown))
            }
            Ok(Err(join_err)) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                ToolResult::raised(name, &message)
                    .with_traceback(format!("tool '{}' panicked: {}", name, message))
            }
            Ok(Err(join_err)) => ToolResult::raised(name, &join_err),
            Err(_elapsed) => {
                handle.abort();
                self.record(|stats| stats.record_timeout());
                let result = ToolResult::timed_out(name, timeout);
                tracing::warn!(tool = %name, timeout_secs = timeout.as_secs_f64(), "tool timed out");
                return result;
            }
        };

        self.record(|stats| stats.record_failure());
        tracing::warn!(tool = %name, error = ?result.error, "tool failed");
        result
    }

    /// Execute several tool calls concurrently, results in input order
    pub async fn execute_all(&self, specs: &[ToolSpec], timeout: Option<Duration>) -> Vec<ToolResult> {
        tracing::debug!(tool_count = specs.len(), "parallel dispatch");
        join_all(specs.iter().map(|spec| self.execute(spec, timeout))).await
    }

    /// Get registry reference
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Get all tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// Check if tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Wait bound used when a call does not specify one
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Shared worker pool
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Snapshot of execution statistics
    pub fn stats(&self) -> ToolStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Shut down the underlying pool
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    fn record(&self, update: impl FnOnce(&mut ToolStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut stats);
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::with_workers(DEFAULT_MAX_WORKERS, DEFAULT_TOOL_TIMEOUT)
    }
}

impl std::fmt::Debug for ToolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRunner")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
