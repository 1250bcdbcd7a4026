use langgraph::NodeRunError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CitationError {
    /// 模型返回的引用声明无法解析为 JSON
    #[error("invalid citation claims: {0}")]
    InvalidClaims(String),
}

impl From<CitationError> for NodeRunError {
    fn from(error: CitationError) -> Self {
        NodeRunError::Other(error.to_string())
    }
}
