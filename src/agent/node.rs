//! Kernel node: the entry point a host pipeline calls
//!
//! Owns the driving loop. Given an input blackboard it assigns a run id,
//! checkpoints INIT, steps the executor until END and hands back the final
//! blackboard (which always carries `run_id`).

use crate::agent::executor::KernelExecutor;
use crate::agent::logic::{AgentLogic, SimpleFn, StageFn};
use crate::agent::state::{Blackboard, RunState, Stage};
use crate::errors::Result;
use crate::telemetry::events;
use serde_json::{json, Value};
use std::sync::Arc;

/// Runs user logic through the full lifecycle
#[derive(Clone)]
pub struct KernelNode {
    executor: Arc<KernelExecutor>,
    logic: Arc<dyn AgentLogic>,
}

impl KernelNode {
    /// Create node from any [`AgentLogic`]
    pub fn new(executor: Arc<KernelExecutor>, logic: Arc<dyn AgentLogic>) -> Self {
        Self { executor, logic }
    }

    /// Node whose logic is called at PLAN, OBSERVE and DECIDE with the stage
    pub fn stage_aware<F>(executor: Arc<KernelExecutor>, func: F) -> Self
    where
        F: Fn(&Blackboard, Stage) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(executor, Arc::new(StageFn::new(func)))
    }

    /// Node whose logic only sees the blackboard, called at PLAN and DECIDE
    pub fn simple<F>(executor: Arc<KernelExecutor>, func: F) -> Self
    where
        F: Fn(&Blackboard) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(executor, Arc::new(SimpleFn::new(func)))
    }

    /// Executor driving this node
    pub fn executor(&self) -> &Arc<KernelExecutor> {
        &self.executor
    }

    /// Run a fresh lifecycle over `input`, returning the final blackboard
    pub async fn run(&self, input: Blackboard) -> Result<Blackboard> {
        let mut data = input;
        let run_id = self.executor.start_run(&mut data);
        let state = RunState::new(run_id, data);

        self.executor.checkpoint(&state)?;
        self.drive(state).await
    }

    /// Drive an existing run until END
    ///
    /// Accepts a run positioned at any stage, e.g. one rebuilt from a
    /// checkpoint record.
    pub async fn drive(&self, mut state: RunState) -> Result<Blackboard> {
        let run_id = state.run_id().to_string();
        tracing::info!(run_id = %run_id, stage = %state.stage(), "run started");
        self.executor
            .trace(&run_id, events::RUN_START, json!({ "stage": state.stage() }));

        let mut steps = 0usize;
        while !state.is_terminal() {
            self.executor.step(&mut state, self.logic.as_ref()).await?;
            steps += 1;
        }

        tracing::info!(run_id = %run_id, steps, "run completed");
        self.executor.trace(
            &run_id,
            events::RUN_COMPLETE,
            json!({ "stage": state.stage(), "steps": steps }),
        );
        Ok(state.into_data())
    }
}

impl std::fmt::Debug for KernelNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelNode")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore};
    use crate::telemetry::MemoryTraceSink;
    use crate::tools::ToolRunner;

    fn executor() -> (Arc<KernelExecutor>, Arc<MemoryCheckpointStore>) {
        let checkpoints = Arc::new(MemoryCheckpointStore::new());
        let executor = KernelExecutor::new(
            Arc::new(ToolRunner::default()),
            checkpoints.clone(),
            Arc::new(MemoryTraceSink::new()),
        );
        (Arc::new(executor), checkpoints)
    }

    #[tokio::test]
    async fn test_run_checkpoints_every_stage() {
        let (executor, checkpoints) = executor();
        let node = KernelNode::simple(executor, |_| Ok(Value::Null));

        let output = node.run(Blackboard::new()).await.unwrap();
        let run_id = output["run_id"].as_str().unwrap();

        assert_eq!(checkpoints.saved_stages(run_id), Stage::ALL.to_vec());
        assert_eq!(output["plan"], json!({}));
        assert_eq!(output["decision"], json!({}));
    }

    #[tokio::test]
    async fn test_drive_from_checkpoint() {
        let (executor, checkpoints) = executor();
        let mut input = Blackboard::new();
        input.insert("run_id".into(), json!("resumed"));
        input.insert("plan".into(), json!({"note": "from earlier"}));
        checkpoints.save("resumed", Stage::Act, &input).unwrap();

        let record = checkpoints.load("resumed", None).unwrap().unwrap();
        let node = KernelNode::stage_aware(executor, |_, stage| Ok(json!({ "at": stage })));
        let output = node.drive(record.into_run_state("resumed")).await.unwrap();

        assert_eq!(output["plan"], json!({"note": "from earlier"}));
        assert_eq!(output["obs_summary"], json!({"at": "OBSERVE"}));
        assert_eq!(
            checkpoints.saved_stages("resumed"),
            vec![Stage::Act, Stage::Observe, Stage::Decide, Stage::End]
        );
    }
}
