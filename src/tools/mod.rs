//! Tool invocation layer
//!
//! Provides isolated tool execution with:
//! - Registry of named tools (single structured argument)
//! - Bounded worker pool (4 concurrent invocations by default)
//! - Per-call timeout (5 s by default)
//! - Normalized results: failures are data, never errors
//! - Structural validation of planned tool calls

pub mod types;
pub mod registry;
pub mod pool;
pub mod runner;
pub mod validator;

// Re-export commonly used types
pub use types::{ToolResult, ToolSpec, ToolStats};
pub use registry::{BlockingBody, FnTool, Tool, ToolRegistry};
pub use pool::{PoolError, WorkerPool, DEFAULT_MAX_WORKERS};
pub use runner::{ToolRunner, DEFAULT_TOOL_TIMEOUT};
pub use validator::{ShapeError, ShapeValidator, ToolValidator};
