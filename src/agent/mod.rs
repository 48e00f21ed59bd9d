//! Agent lifecycle
//!
//! State machine, stage logic contract, executor and the node that drives a
//! run from INIT to END.

pub mod state;
pub mod logic;
pub mod executor;
pub mod node;

// Re-export commonly used types
pub use state::{Blackboard, RunState, Stage, StageMachine, Transition};
pub use logic::{AgentLogic, LogicErrorPolicy, SimpleFn, StageFn};
pub use executor::KernelExecutor;
pub use node::KernelNode;
