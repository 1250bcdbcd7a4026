//! # langchain_b12
//!
//! langchain 的可复用工具与实现集合。
//!
//! - `genai`：Google Generative AI（Gemini）消息转换与聊天模型
//! - `citations`：为任意聊天模型的回答加上指向源文档的引用

#[cfg(feature = "citations")]
pub mod citations;

pub use langchain_core;

#[cfg(feature = "genai")]
pub use langchain_genai as genai;
