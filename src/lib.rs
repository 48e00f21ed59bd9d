//! agentkernel - lifecycle kernel for tool-using agents
//!
//! Drives an agent through a fixed sequence of stages and isolates the tool
//! calls it makes along the way.
//!
//! # Architecture
//!
//! - **agent**: stage table, run state, executor, entry-point node
//! - **tools**: registry, bounded worker pool, timeouts, result normalization
//! - **checkpoint**: per-stage snapshots of the blackboard
//! - **telemetry**: append-only trace events per run
//!
//! ```text
//! INIT -> PLAN -> ACT -> OBSERVE -> DECIDE -> END
//!                                     \________/ (finish)
//! ```

pub mod errors;
pub mod agent;
pub mod tools;
pub mod checkpoint;
pub mod telemetry;
pub mod config;
pub mod cli;
pub mod logging;

// Re-export commonly used types
pub use errors::{KernelError, Result};
pub use agent::{AgentLogic, Blackboard, KernelExecutor, KernelNode, RunState, Stage};
pub use tools::{ToolResult, ToolRunner, ToolSpec, WorkerPool};
pub use config::KernelConfig;
