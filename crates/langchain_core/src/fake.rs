//! 测试用的假模型

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;

use crate::{error::ModelError, message::Message, model::LlmModel, request::ToolSpec};

/// 按顺序返回预设回复，并记录每次调用收到的消息
#[derive(Debug, Default)]
pub struct FakeChatModel {
    responses: Mutex<VecDeque<Result<Message, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl FakeChatModel {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一个失败的回复
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(Err(message.into()));
        }
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmModel for FakeChatModel {
    async fn invoke(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<Message, ModelError> {
        self.calls
            .lock()
            .map_err(|_| ModelError::Other("fake model poisoned".to_owned()))?
            .push(messages.to_vec());
        let next = self
            .responses
            .lock()
            .map_err(|_| ModelError::Other("fake model poisoned".to_owned()))?
            .pop_front();
        match next {
            Some(Ok(message)) => Ok(message),
            Some(Err(error)) => Err(ModelError::Other(error)),
            None => Err(ModelError::Other("no more fake responses".to_owned())),
        }
    }
}
