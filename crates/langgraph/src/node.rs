use async_trait::async_trait;
use langchain_core::ModelError;
use thiserror::Error;

/// 可在图中流转的状态，节点返回的增量通过 `apply` 合并
pub trait GraphState: Clone + Send + Sync + 'static {
    type Update: Send;

    fn apply(&mut self, update: Self::Update);
}

#[derive(Debug, Error)]
pub enum NodeRunError {
    #[error("model error: {0}")]
    ModelError(#[from] ModelError),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    async fn run(&self, state: &S) -> Result<S::Update, NodeRunError>;
}
