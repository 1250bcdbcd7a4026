//! # langgraph
//!
//! 基于状态图的执行引擎：节点读取状态并返回增量，边（固定或条件）决定下一个节点。

pub mod graph;
pub mod graph_runner;
pub mod label;
pub mod node;

pub use graph::StateGraph;
pub use graph_runner::{DEFAULT_MAX_STEPS, GraphRunnerError, GraphStepper, StepEvent};
pub use label::{BaseAgentLabel, GraphLabel, InternedGraphLabel};
pub use node::{GraphState, Node, NodeRunError};
