//! Tool registry
//!
//! Maps tool names to implementations. Every tool takes one structured
//! argument (the `args` object of the call) and returns one JSON value.
//!
//! The registry is shared by all callers of a [`ToolRunner`](crate::tools::ToolRunner);
//! concurrent register/unregister/execute against the same name are not
//! ordered with respect to each other.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Synchronous tool body, run on a blocking thread
pub type BlockingBody = Arc<dyn Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync>;

/// A named operation the agent can invoke during ACT
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invoke the tool with its structured argument
    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value>;

    /// Blocking body for tools that occupy a thread while they run
    ///
    /// When present, the runner executes it through
    /// [`WorkerPool::submit_blocking`](crate::tools::WorkerPool::submit_blocking)
    /// so the thread keeps its pool slot until it returns.
    fn blocking_body(&self) -> Option<BlockingBody> {
        None
    }
}

/// Adapter running a plain blocking function on the blocking thread pool
pub struct FnTool<F> {
    func: Arc<F>,
}

impl<F> FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    async fn call(&self, args: Map<String, Value>) -> anyhow::Result<Value> {
        let func = Arc::clone(&self.func);
        // A panic inside the function surfaces as a JoinError and is
        // re-raised so the runner reports it like any other failure.
        match tokio::task::spawn_blocking(move || func(args)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }

    fn blocking_body(&self) -> Option<BlockingBody> {
        let body: BlockingBody = self.func.clone();
        Some(body)
    }
}

/// Tool registry
#[derive(Default)]
pub struct ToolRegistry {
    /// Map of tool name to implementation
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tool
    pub fn register(&self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        let name = name.into();
        tracing::debug!(tool = %name, "registering tool");
        self.write().insert(name, tool);
    }

    /// Remove a tool; no-op when absent
    pub fn unregister(&self, name: &str) {
        if self.write().remove(name).is_some() {
            tracing::debug!(tool = %name, "unregistered tool");
        }
    }

    /// Get tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.read().get(name).cloned()
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
