//! Structural validation of tool calls before execution
//!
//! A tool call must be an object with a string `name`; `args`, when present,
//! must be an object. Nothing else is checked here.

use crate::tools::types::ToolSpec;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a tool call is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("tool call must be an object")]
    NotAnObject,

    #[error("tool call must include a 'name' key of type string")]
    MissingName,

    #[error("tool call 'args' must be an object if provided")]
    ArgsNotAnObject,
}

/// Checks the shape of a tool call
pub trait ToolValidator: Send + Sync {
    /// Validate a raw tool call, returning the typed spec
    fn validate(&self, tool_call: &Value) -> Result<ToolSpec, ShapeError>;
}

/// Default structural validator
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeValidator;

impl ShapeValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ToolValidator for ShapeValidator {
    fn validate(&self, tool_call: &Value) -> Result<ToolSpec, ShapeError> {
        let call = tool_call.as_object().ok_or(ShapeError::NotAnObject)?;

        let name = call
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ShapeError::MissingName)?;

        let args = match call.get("args") {
            None => Map::new(),
            Some(Value::Object(args)) => args.clone(),
            Some(_) => return Err(ShapeError::ArgsNotAnObject),
        };

        Ok(ToolSpec::new(name, args))
    }
}
