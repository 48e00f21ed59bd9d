//! Lifecycle executor
//!
//! Advances a run one stage at a time:
//! 1. Transition via the state machine (errors abort the run)
//! 2. Trace `stage_enter`
//! 3. Apply the stage body against the blackboard
//! 4. Checkpoint `(run_id, stage, data)` and trace `stage_complete`
//!
//! Stage bodies:
//! - PLAN: logic output stored under `plan`
//! - ACT: `plan.tool` validated and executed, result appended to `observations`
//! - OBSERVE: logic output stored under `obs_summary`
//! - DECIDE: logic output stored under `decision`; a truthy `finish` takes the
//!   DECIDE -> END edge and returns early
//!
//! The executor holds no per-run state, so one instance can drive many runs
//! concurrently.

use crate::agent::logic::{AgentLogic, LogicErrorPolicy};
use crate::agent::state::{Blackboard, RunState, Stage, StageMachine, Transition};
use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::KernelConfig;
use crate::errors::{KernelError, Result};
use crate::telemetry::{events, JsonlTraceSink, TraceSink};
use crate::tools::{ShapeValidator, ToolRunner, ToolValidator};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Blackboard key holding the run identifier
pub const RUN_ID_KEY: &str = "run_id";
/// Blackboard key holding the PLAN output
pub const PLAN_KEY: &str = "plan";
/// Blackboard key holding the tool results
pub const OBSERVATIONS_KEY: &str = "observations";
/// Blackboard key holding the OBSERVE output
pub const OBS_SUMMARY_KEY: &str = "obs_summary";
/// Blackboard key holding the DECIDE output
pub const DECISION_KEY: &str = "decision";
/// Blackboard key holding recorded logic failures
pub const LOGIC_ERRORS_KEY: &str = "logic_errors";

/// Drives runs through the lifecycle
pub struct KernelExecutor {
    /// Tool invocation layer
    tools: Arc<ToolRunner>,

    /// Tool call shape validator
    validator: Arc<dyn ToolValidator>,

    /// Checkpoint store
    checkpoints: Arc<dyn CheckpointStore>,

    /// Trace sink
    tracer: Arc<dyn TraceSink>,

    /// Handling of failed stage logic
    logic_error_policy: LogicErrorPolicy,

    /// Per-call tool timeout override
    tool_timeout: Option<Duration>,
}

impl KernelExecutor {
    /// Create executor with the default shape validator
    pub fn new(
        tools: Arc<ToolRunner>,
        checkpoints: Arc<dyn CheckpointStore>,
        tracer: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            tools,
            validator: Arc::new(ShapeValidator::new()),
            checkpoints,
            tracer,
            logic_error_policy: LogicErrorPolicy::default(),
            tool_timeout: None,
        }
    }

    /// Create executor with file-backed stores and a fresh tool runner
    pub fn from_config(config: &KernelConfig) -> Result<Self> {
        config.validate()?;

        let tools = ToolRunner::with_workers(
            config.tools.max_workers,
            config.tools.default_timeout(),
        );
        let checkpoints = FileCheckpointStore::new(&config.storage.checkpoint_dir)?;
        let tracer = JsonlTraceSink::new(&config.storage.trace_dir)?;

        Ok(Self::new(Arc::new(tools), Arc::new(checkpoints), Arc::new(tracer))
            .with_logic_error_policy(config.lifecycle.on_logic_error))
    }

    /// Replace the tool call validator
    pub fn with_validator(mut self, validator: Arc<dyn ToolValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Set how failed stage logic is handled
    pub fn with_logic_error_policy(mut self, policy: LogicErrorPolicy) -> Self {
        self.logic_error_policy = policy;
        self
    }

    /// Override the tool runner's default timeout for ACT calls
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Tool invocation layer
    pub fn tools(&self) -> &Arc<ToolRunner> {
        &self.tools
    }

    /// Checkpoint store
    pub fn checkpoints(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoints
    }

    /// Trace sink
    pub fn tracer(&self) -> &Arc<dyn TraceSink> {
        &self.tracer
    }

    /// Ensure the blackboard carries a run id and return it
    ///
    /// An existing non-empty string id is kept untouched.
    pub fn start_run(&self, data: &mut Blackboard) -> String {
        if let Some(run_id) = data.get(RUN_ID_KEY).and_then(Value::as_str) {
            if !run_id.is_empty() {
                return run_id.to_string();
            }
        }

        let run_id = Uuid::new_v4().to_string();
        data.insert(RUN_ID_KEY.to_string(), Value::String(run_id.clone()));
        tracing::info!(run_id = %run_id, "assigned run id");
        run_id
    }

    /// Advance one stage and run its body
    ///
    /// Returns the stage the run is in afterwards.
    pub async fn step(&self, state: &mut RunState, logic: &dyn AgentLogic) -> Result<Stage> {
        let stage = StageMachine::transition(state)?;
        self.trace(state.run_id(), events::STAGE_ENTER, json!({ "stage": stage }));

        match stage {
            Stage::Plan => {
                let plan = self.invoke(state, logic, stage).await?;
                state.data.insert(PLAN_KEY.to_string(), plan);
            }
            Stage::Act => self.act(state).await?,
            Stage::Observe => {
                let summary = self.invoke(state, logic, stage).await?;
                state.data.insert(OBS_SUMMARY_KEY.to_string(), summary);
            }
            Stage::Decide => {
                let decision = self.invoke(state, logic, stage).await?;
                let finish = decision.get("finish").is_some_and(is_truthy);
                state.data.insert(DECISION_KEY.to_string(), decision);

                if finish {
                    StageMachine::apply(state, Transition::Finish)?;
                    self.checkpoint_and_trace(state)?;
                    return Ok(state.stage());
                }
            }
            Stage::Init | Stage::End => {}
        }

        self.checkpoint_and_trace(state)?;
        Ok(state.stage())
    }

    /// Persist the run at its current stage
    pub fn checkpoint(&self, state: &RunState) -> Result<String> {
        self.checkpoints
            .save(state.run_id(), state.stage(), &state.data)
    }

    /// Emit a trace event; sink failures are logged and otherwise ignored
    pub fn trace(&self, run_id: &str, event: &str, payload: Value) {
        if let Err(err) = self.tracer.emit(run_id, event, payload) {
            tracing::warn!(run_id, event, error = %err, "failed to write trace event");
        }
    }

    fn checkpoint_and_trace(&self, state: &RunState) -> Result<()> {
        self.checkpoint(state)?;
        self.trace(
            state.run_id(),
            events::STAGE_COMPLETE,
            json!({ "stage": state.stage() }),
        );
        Ok(())
    }

    /// Call stage logic, mapping "nothing" to `{}` and handling failures
    async fn invoke(
        &self,
        state: &mut RunState,
        logic: &dyn AgentLogic,
        stage: Stage,
    ) -> Result<Value> {
        let err = match logic.run(&state.data, stage).await {
            Ok(Value::Null) => return Ok(Value::Object(Map::new())),
            Ok(output) => return Ok(output),
            Err(err) => err,
        };

        let message = format!("{:#}", err);
        tracing::warn!(run_id = %state.run_id(), %stage, error = %message, "agent logic failed");
        self.trace(
            state.run_id(),
            events::LOGIC_FAILED,
            json!({ "stage": stage, "error": message }),
        );

        match self.logic_error_policy {
            LogicErrorPolicy::Abort => Err(KernelError::Logic {
                stage: stage.to_string(),
                message,
            }),
            LogicErrorPolicy::Record => {
                append(
                    &mut state.data,
                    LOGIC_ERRORS_KEY,
                    json!({ "stage": stage, "error": message }),
                );
                Ok(Value::Object(Map::new()))
            }
        }
    }

    /// ACT body: validate and run the planned tool call, if any
    async fn act(&self, state: &mut RunState) -> Result<()> {
        let tool_call = state
            .data
            .get(PLAN_KEY)
            .and_then(|plan| plan.get("tool"))
            .filter(|tool| is_truthy(tool))
            .cloned();

        let Some(tool_call) = tool_call else {
            tracing::debug!(run_id = %state.run_id(), "no tool planned");
            return Ok(());
        };

        let spec = self.validator.validate(&tool_call)?;
        let result = self.tools.execute(&spec, self.tool_timeout).await;

        self.trace(
            state.run_id(),
            events::TOOL_RESULT,
            json!({ "tool": result.tool, "ok": result.ok, "error": result.error }),
        );
        append(&mut state.data, OBSERVATIONS_KEY, serde_json::to_value(&result)?);
        Ok(())
    }
}

impl std::fmt::Debug for KernelExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelExecutor")
            .field("tools", &self.tools)
            .field("logic_error_policy", &self.logic_error_policy)
            .field("tool_timeout", &self.tool_timeout)
            .finish_non_exhaustive()
    }
}

/// Append to an array under `key`, creating it if absent
///
/// A non-array value already stored under the key becomes the first element.
fn append(data: &mut Blackboard, key: &str, item: Value) {
    let slot = data
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));

    if !slot.is_array() {
        let previous = slot.take();
        *slot = Value::Array(vec![previous]);
    }
    if let Value::Array(items) = slot {
        items.push(item);
    }
}

/// Truthiness of a blackboard value: null, false, zero and empty
/// strings/arrays/objects are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
