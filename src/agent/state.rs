//! Lifecycle state machine
//!
//! The stage table is a single linear chain:
//!
//! ```text
//! INIT -> PLAN -> ACT -> OBSERVE -> DECIDE -> END
//! ```
//!
//! Every stage mutation goes through [`StageMachine::apply`]. Besides the
//! table-driven [`Transition::Advance`], the only other edge is
//! [`Transition::Finish`] (DECIDE -> END), taken when the agent decides it is
//! done.

use crate::errors::{KernelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Free-form key/value data attached to a run
pub type Blackboard = Map<String, Value>;

/// Lifecycle stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    /// Starting point, no logic body
    Init,

    /// Agent logic produces a plan (optionally with a tool call)
    Plan,

    /// Planned tool call is validated and executed
    Act,

    /// Agent logic summarizes observations
    Observe,

    /// Agent logic decides whether to finish
    Decide,

    /// Terminal stage
    End,
}

impl Stage {
    /// All stages in lifecycle order
    pub const ALL: [Stage; 6] = [
        Stage::Init,
        Stage::Plan,
        Stage::Act,
        Stage::Observe,
        Stage::Decide,
        Stage::End,
    ];

    /// Fixed successor of this stage, `None` for END
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Plan),
            Stage::Plan => Some(Stage::Act),
            Stage::Act => Some(Stage::Observe),
            Stage::Observe => Some(Stage::Decide),
            Stage::Decide => Some(Stage::End),
            Stage::End => None,
        }
    }

    /// Check if this is the terminal stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::End)
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "INIT",
            Stage::Plan => "PLAN",
            Stage::Act => "ACT",
            Stage::Observe => "OBSERVE",
            Stage::Decide => "DECIDE",
            Stage::End => "END",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| KernelError::UnknownStage(s.to_string()))
    }
}

/// Edges of the lifecycle graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Follow the stage table
    Advance,

    /// DECIDE -> END, bypassing the rest of the table
    Finish,
}

/// Validates and applies stage transitions
pub struct StageMachine;

impl StageMachine {
    /// Compute the target stage of a transition without applying it
    ///
    /// Valid edges:
    /// 1. any non-terminal stage -> its table successor (Advance)
    /// 2. DECIDE -> END (Finish)
    pub fn target(from: Stage, transition: Transition) -> Result<Stage> {
        match transition {
            Transition::Advance => from.next().ok_or_else(|| KernelError::InvalidTransition {
                from: from.to_string(),
                reason: "no next stage is defined after a terminal stage".to_string(),
            }),
            Transition::Finish if from == Stage::Decide => Ok(Stage::End),
            Transition::Finish => Err(KernelError::InvalidTransition {
                from: from.to_string(),
                reason: "finish is only allowed from DECIDE".to_string(),
            }),
        }
    }

    /// Apply a transition to the run, mutating only its stage
    pub fn apply(state: &mut RunState, transition: Transition) -> Result<Stage> {
        let next = Self::target(state.stage, transition)?;
        tracing::debug!(
            run_id = %state.run_id,
            from = %state.stage,
            to = %next,
            ?transition,
            "stage transition"
        );
        state.stage = next;
        Ok(next)
    }

    /// Advance the run along the stage table
    pub fn transition(state: &mut RunState) -> Result<Stage> {
        Self::apply(state, Transition::Advance)
    }
}

/// Mutable record of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    run_id: String,
    stage: Stage,

    /// Blackboard mutated by stage logic
    pub data: Blackboard,
}

impl RunState {
    /// Create a run positioned at INIT
    pub fn new(run_id: impl Into<String>, data: Blackboard) -> Self {
        Self {
            run_id: run_id.into(),
            stage: Stage::Init,
            data,
        }
    }

    /// Create a run positioned at an arbitrary stage, e.g. when replaying
    /// from a checkpoint
    pub fn at_stage(run_id: impl Into<String>, stage: Stage, data: Blackboard) -> Self {
        Self {
            run_id: run_id.into(),
            stage,
            data,
        }
    }

    /// Run identifier, fixed for the lifetime of the run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether the run has reached END
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Consume the run, returning its blackboard
    pub fn into_data(self) -> Blackboard {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = Stage::Init;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, Stage::ALL.to_vec());
    }

    #[test]
    fn test_next_is_deterministic() {
        for stage in Stage::ALL {
            assert_eq!(stage.next(), stage.next());
        }
        assert_eq!(Stage::End.next(), None);
    }

    #[test]
    fn test_transition_advances_run() {
        let mut state = RunState::new("run-1", Blackboard::new());
        assert_eq!(StageMachine::transition(&mut state).unwrap(), Stage::Plan);
        assert_eq!(state.stage(), Stage::Plan);
        assert_eq!(state.run_id(), "run-1");
    }

    #[test]
    fn test_transition_from_end_fails() {
        let mut state = RunState::at_stage("run-1", Stage::End, Blackboard::new());
        let err = StageMachine::transition(&mut state).unwrap_err();
        assert!(matches!(err, KernelError::InvalidTransition { .. }));
        assert_eq!(state.stage(), Stage::End);
    }

    #[test]
    fn test_finish_only_from_decide() {
        let mut state = RunState::at_stage("run-1", Stage::Decide, Blackboard::new());
        assert_eq!(
            StageMachine::apply(&mut state, Transition::Finish).unwrap(),
            Stage::End
        );
        assert!(state.is_terminal());

        for stage in [Stage::Init, Stage::Plan, Stage::Act, Stage::Observe, Stage::End] {
            let mut state = RunState::at_stage("run-1", stage, Blackboard::new());
            assert!(StageMachine::apply(&mut state, Transition::Finish).is_err());
            assert_eq!(state.stage(), stage);
        }
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("ACT".parse::<Stage>().unwrap(), Stage::Act);
        assert_eq!("observe".parse::<Stage>().unwrap(), Stage::Observe);

        let err = "REFLECT".parse::<Stage>().unwrap_err();
        assert!(matches!(err, KernelError::UnknownStage(ref s) if s == "REFLECT"));
    }

    #[test]
    fn test_stage_serializes_upper_case() {
        assert_eq!(serde_json::to_value(Stage::Decide).unwrap(), "DECIDE");
        let stage: Stage = serde_json::from_value(serde_json::json!("PLAN")).unwrap();
        assert_eq!(stage, Stage::Plan);
    }

    #[test]
    fn test_terminal_states() {
        assert!(Stage::End.is_terminal());
        assert!(!Stage::Decide.is_terminal());
        assert!(!RunState::new("r", Blackboard::new()).is_terminal());
    }
}
