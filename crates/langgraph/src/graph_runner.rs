use thiserror::Error;

use crate::{
    graph::{Edge, StateGraph},
    label::InternedGraphLabel,
    node::{GraphState, NodeRunError},
};

pub const DEFAULT_MAX_STEPS: usize = 25;

#[derive(Debug, Error)]
pub enum GraphRunnerError {
    #[error("graph has no start label")]
    MissingStart,
    #[error("graph has no end label")]
    MissingEnd,
    #[error("node '{0}' is not registered")]
    NodeNotFound(InternedGraphLabel),
    #[error("node '{0}' has no outgoing edge")]
    MissingEdge(InternedGraphLabel),
    #[error("graph exceeded {0} steps")]
    MaxStepsExceeded(usize),
    #[error("node '{label}' failed: {source}")]
    NodeRun {
        label: InternedGraphLabel,
        #[source]
        source: NodeRunError,
    },
    #[error("graph already finished")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    NodeEnd { label: InternedGraphLabel },
    Finished { steps: usize },
}

/// 逐个节点地执行 [`StateGraph`]
pub struct GraphStepper<'g, S: GraphState> {
    graph: &'g StateGraph<S>,
    state: S,
    next: Option<InternedGraphLabel>,
    steps: usize,
    max_steps: usize,
    started: bool,
    finished: bool,
}

impl<'g, S: GraphState> GraphStepper<'g, S> {
    pub fn new(graph: &'g StateGraph<S>, state: S, max_steps: usize) -> Self {
        Self {
            graph,
            state,
            next: None,
            steps: 0,
            max_steps,
            started: false,
            finished: false,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn successor(&self, label: InternedGraphLabel) -> Result<InternedGraphLabel, GraphRunnerError> {
        match self.graph.edge(label) {
            Some(Edge::Node(to)) => Ok(*to),
            Some(Edge::Condition(condition)) => Ok(condition(&self.state)),
            None => Err(GraphRunnerError::MissingEdge(label)),
        }
    }

    /// 执行下一个节点；到达终点时返回 [`StepEvent::Finished`]
    pub async fn step(&mut self) -> Result<StepEvent, GraphRunnerError> {
        if self.finished {
            return Err(GraphRunnerError::Finished);
        }
        let end = self.graph.end().ok_or(GraphRunnerError::MissingEnd)?;
        if !self.started {
            let start = self.graph.start().ok_or(GraphRunnerError::MissingStart)?;
            self.next = Some(self.successor(start)?);
            self.started = true;
        }
        let Some(label) = self.next else {
            return Err(GraphRunnerError::MissingStart);
        };

        if label == end {
            // 终点节点可选，注册了就执行一次
            if let Some(node) = self.graph.node(end) {
                let update = node
                    .run(&self.state)
                    .await
                    .map_err(|source| GraphRunnerError::NodeRun { label, source })?;
                self.state.apply(update);
            }
            self.finished = true;
            return Ok(StepEvent::Finished { steps: self.steps });
        }

        if self.steps >= self.max_steps {
            tracing::error!(max_steps = self.max_steps, "图执行超过最大步数");
            return Err(GraphRunnerError::MaxStepsExceeded(self.max_steps));
        }

        let node = self
            .graph
            .node(label)
            .ok_or(GraphRunnerError::NodeNotFound(label))?;
        tracing::debug!(node = %label, step = self.steps, "运行节点");
        let update = match node.run(&self.state).await {
            Ok(update) => update,
            Err(source) => {
                tracing::error!(node = %label, "节点执行失败: {}", source);
                return Err(GraphRunnerError::NodeRun { label, source });
            }
        };
        self.state.apply(update);
        self.steps += 1;
        self.next = Some(self.successor(label)?);
        Ok(StepEvent::NodeEnd { label })
    }
}
