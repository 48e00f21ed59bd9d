//! Error types for agentkernel
//!
//! Fatal conditions that abort a run. Tool failures never show up here:
//! they are folded into a [`ToolResult`](crate::tools::ToolResult) instead.

use crate::tools::validator::ShapeError;
use thiserror::Error;

/// Main error type for the lifecycle kernel
#[derive(Error, Debug)]
pub enum KernelError {
    /// State machine transition errors
    #[error("Invalid stage transition from {from}: {reason}")]
    InvalidTransition { from: String, reason: String },

    /// Stage name outside the closed lifecycle set
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// Malformed tool call produced by PLAN logic
    #[error("Tool call rejected: {0}")]
    Shape(#[from] ShapeError),

    /// User stage logic failed and the run is configured to abort
    #[error("Agent logic failed at {stage}: {message}")]
    Logic { stage: String, message: String },

    /// Checkpoint persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Kernel error: {0}")]
    Generic(String),
}

/// Result type alias for kernel operations
pub type Result<T> = std::result::Result<T, KernelError>;

/// Convert anyhow errors to KernelError
impl From<anyhow::Error> for KernelError {
    fn from(err: anyhow::Error) -> Self {
        KernelError::Generic(err.to_string())
    }
}
