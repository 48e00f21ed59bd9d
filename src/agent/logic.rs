//! User-supplied stage logic
//!
//! The executor calls [`AgentLogic::run`] at PLAN, OBSERVE and DECIDE. A
//! returned `Value::Null` means "nothing to report" and is stored as `{}`.
//! Errors are never swallowed: the executor traces them and then applies the
//! configured [`LogicErrorPolicy`].

use crate::agent::state::{Blackboard, Stage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the executor does when stage logic fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicErrorPolicy {
    /// Store `{}` for the stage, append the failure to `logic_errors`, continue
    #[default]
    Record,

    /// Abort the run with [`KernelError::Logic`](crate::errors::KernelError::Logic)
    Abort,
}

/// Stage-aware agent logic
#[async_trait]
pub trait AgentLogic: Send + Sync {
    /// Produce the output of `stage` from the current blackboard
    async fn run(&self, data: &Blackboard, stage: Stage) -> anyhow::Result<Value>;
}

/// Stage-aware closure, called at every logic stage
pub struct StageFn<F>(F);

impl<F> StageFn<F>
where
    F: Fn(&Blackboard, Stage) -> anyhow::Result<Value> + Send + Sync,
{
    /// Wrap a closure taking the blackboard and the stage
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

#[async_trait]
impl<F> AgentLogic for StageFn<F>
where
    F: Fn(&Blackboard, Stage) -> anyhow::Result<Value> + Send + Sync,
{
    async fn run(&self, data: &Blackboard, stage: Stage) -> anyhow::Result<Value> {
        (self.0)(data, stage)
    }
}

/// Closure that only sees the blackboard
///
/// Called at PLAN and DECIDE; every other stage yields nothing. The same
/// function therefore has to produce both the plan and the decision.
pub struct SimpleFn<F>(F);

impl<F> SimpleFn<F>
where
    F: Fn(&Blackboard) -> anyhow::Result<Value> + Send + Sync,
{
    /// Wrap a closure taking only the blackboard
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

#[async_trait]
impl<F> AgentLogic for SimpleFn<F>
where
    F: Fn(&Blackboard) -> anyhow::Result<Value> + Send + Sync,
{
    async fn run(&self, data: &Blackboard, stage: Stage) -> anyhow::Result<Value> {
        match stage {
            Stage::Plan | Stage::Decide => (self.0)(data),
            _ => Ok(Value::Null),
        }
    }
}
