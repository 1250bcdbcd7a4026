use std::{collections::HashMap, sync::Arc};

use crate::{
    graph_runner::{GraphRunnerError, GraphStepper, StepEvent},
    label::{GraphLabel, InternedGraphLabel},
    node::{GraphState, Node},
};

pub type ConditionFn<S> = Arc<dyn Fn(&S) -> InternedGraphLabel + Send + Sync>;

pub enum Edge<S> {
    /// 固定跳转
    Node(InternedGraphLabel),
    /// 根据当前状态选择下一个节点
    Condition(ConditionFn<S>),
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Edge::Node(label) => Edge::Node(*label),
            Edge::Condition(condition) => Edge::Condition(condition.clone()),
        }
    }
}

pub struct StateGraph<S: GraphState> {
    pub(crate) nodes: HashMap<InternedGraphLabel, Arc<dyn Node<S>>>,
    pub(crate) edges: HashMap<InternedGraphLabel, Edge<S>>,
    pub(crate) start: Option<InternedGraphLabel>,
    pub(crate) end: Option<InternedGraphLabel>,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            start: None,
            end: None,
        }
    }
}

impl<S: GraphState> StateGraph<S> {
    pub fn add_node<N>(&mut self, label: impl GraphLabel, node: N) -> &mut Self
    where
        N: Node<S> + 'static,
    {
        self.nodes.insert(label.intern(), Arc::new(node));
        self
    }

    pub fn set_start(&mut self, label: impl GraphLabel) -> &mut Self {
        self.start = Some(label.intern());
        self
    }

    pub fn set_end(&mut self, label: impl GraphLabel) -> &mut Self {
        self.end = Some(label.intern());
        self
    }

    /// `from` 执行完后固定跳转到 `to`，会覆盖 `from` 已有的出边
    pub fn add_node_edge(&mut self, from: impl GraphLabel, to: impl GraphLabel) -> &mut Self {
        self.edges.insert(from.intern(), Edge::Node(to.intern()));
        self
    }

    pub fn add_condition_edge<F>(&mut self, from: impl GraphLabel, condition: F) -> &mut Self
    where
        F: Fn(&S) -> InternedGraphLabel + Send + Sync + 'static,
    {
        self.edges
            .insert(from.intern(), Edge::Condition(Arc::new(condition)));
        self
    }

    pub fn node(&self, label: InternedGraphLabel) -> Option<&Arc<dyn Node<S>>> {
        self.nodes.get(&label)
    }

    pub fn edge(&self, label: InternedGraphLabel) -> Option<&Edge<S>> {
        self.edges.get(&label)
    }

    pub fn start(&self) -> Option<InternedGraphLabel> {
        self.start
    }

    pub fn end(&self) -> Option<InternedGraphLabel> {
        self.end
    }

    /// 从起点运行到终点，返回最终状态
    pub async fn invoke(&self, state: S, max_steps: usize) -> Result<S, GraphRunnerError> {
        let mut stepper = GraphStepper::new(self, state, max_steps);
        loop {
            match stepper.step().await? {
                StepEvent::Finished { steps } => {
                    tracing::debug!(steps, "graph finished");
                    return Ok(stepper.into_state());
                }
                StepEvent::NodeEnd { .. } => {}
            }
        }
    }
}
