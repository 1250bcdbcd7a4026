//! # langchain_core
//!
//! langchain 库的核心模块，包含了所有的基础类型和函数。

pub mod error;
pub mod fake;
pub mod message;
pub mod model;
pub mod request;

pub use error::{ModelError, RetryConfig, retry_with_backoff};
pub use fake::FakeChatModel;
pub use message::{Citation, ContentBlock, ImageUrl, Message, MessageContent, ToolCall};
pub use model::LlmModel;
pub use request::ToolSpec;
