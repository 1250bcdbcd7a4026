//! # langchain_genai
//!
//! Google Generative AI (Gemini) 集成：把 langchain 消息转换为 Gemini 的
//! `Content`/`Part`，并提供基于 `generateContent` 接口的聊天模型。
//!
//! ```no_run
//! use langchain_core::{LlmModel, Message};
//! use langchain_genai::ChatGoogleGenAIBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ChatGoogleGenAIBuilder::from_env("gemini-2.0-flash")?
//!     .with_temperature(0.2)
//!     .build()?;
//! let reply = model.invoke(&[Message::user("hello")], &[]).await?;
//! println!("{}", reply.text());
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod convert;
pub mod error;
pub mod types;

pub use chat::{ChatGoogleGenAI, ChatGoogleGenAIBuilder, DEFAULT_BASE_URL};
pub use convert::{convert_message_to_parts, convert_messages_to_contents, multi_content_to_part};
pub use error::ConversionError;
pub use types::{Blob, Content, FileData, FunctionCall, FunctionResponse, Part, Role};
