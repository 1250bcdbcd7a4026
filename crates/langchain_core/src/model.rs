use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::ModelError, message::Message, request::ToolSpec};

/// 聊天模型：输入一组消息，输出一条助手消息
#[async_trait]
pub trait LlmModel: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ModelError>;
}

#[async_trait]
impl<M> LlmModel for Arc<M>
where
    M: LlmModel + ?Sized,
{
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ModelError> {
        (**self).invoke(messages, tools).await
    }
}

#[async_trait]
impl<M> LlmModel for Box<M>
where
    M: LlmModel + ?Sized,
{
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ModelError> {
        (**self).invoke(messages, tools).await
    }
}
