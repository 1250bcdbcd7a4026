use langchain_core::ModelError;
use thiserror::Error;

/// langchain 消息转换为 Gemini 内容时的错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unknown content type: {0}")]
    UnsupportedContent(String),
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    #[error("tool call id is required")]
    MissingToolCallId,
    #[error("tool name is required")]
    MissingToolName,
    #[error("expected str content in tool message")]
    ExpectedTextContent,
    #[error("invalid message type: {0}")]
    InvalidMessageType(String),
}

impl From<ConversionError> for ModelError {
    fn from(error: ConversionError) -> Self {
        ModelError::Conversion(error.to_string())
    }
}
