use std::time::Duration;

use async_trait::async_trait;
use langchain_core::{
    LlmModel, Message, ModelError, RetryConfig, ToolCall, ToolSpec, retry_with_backoff,
};
use uuid::Uuid;

use crate::{
    convert::convert_messages_to_contents,
    error::ConversionError,
    types::{
        Content, FunctionDeclaration, GenerateContentRequest, GenerateContentResponse,
        GenerationConfig, Part, Tool,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini 聊天模型
#[derive(Debug, Clone)]
pub struct ChatGoogleGenAI {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    generation_config: GenerationConfig,
    retry: RetryConfig,
}

pub struct ChatGoogleGenAIBuilder {
    model: String,
    base_url: String,
    api_key: Option<String>,
    generation_config: GenerationConfig,
    timeout: Duration,
    retry: RetryConfig,
}

impl ChatGoogleGenAIBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            generation_config: GenerationConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    pub fn from_base(model: &str, base_url: &str, api_key: &str) -> Self {
        Self::new(model)
            .with_base_url(base_url)
            .with_api_key(api_key)
    }

    /// 依次从 `GOOGLE_API_KEY`、`GEMINI_API_KEY` 读取 API key
    pub fn from_env(model: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = resolve_api_key(|name| std::env::var(name).ok())?;
        Ok(Self::new(model).with_api_key(api_key))
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation_config.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.generation_config.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.generation_config.top_k = Some(top_k);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.generation_config.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<ChatGoogleGenAI, ModelError> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ModelError::MissingApiKey(API_KEY_ENV_VARS.join(", ")))?;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ModelError::Request(e.to_string()))?;

        Ok(ChatGoogleGenAI {
            client,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            api_key,
            generation_config: self.generation_config,
            retry: self.retry,
        })
    }
}

fn resolve_api_key<F>(lookup: F) -> Result<String, ModelError>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
        .ok_or_else(|| ModelError::MissingApiKey(API_KEY_ENV_VARS.join(", ")))
}

impl ChatGoogleGenAI {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// 构造请求体：系统消息合并为 `systemInstruction`，其余消息转换为 `contents`
    pub fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<GenerateContentRequest, ConversionError> {
        let (system, conversation): (Vec<&Message>, Vec<&Message>) = messages
            .iter()
            .partition(|message| matches!(message, Message::System { .. }));

        let system_text = system
            .iter()
            .map(|message| message.text())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let system_instruction = if system_text.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::text(system_text)],
            })
        };

        let conversation: Vec<Message> = conversation.into_iter().cloned().collect();
        let contents = convert_messages_to_contents(&conversation)?;

        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![Tool {
                function_declarations: tools
                    .iter()
                    .map(|spec| FunctionDeclaration {
                        name: spec.name.clone(),
                        description: spec.description.clone(),
                        parameters: sanitize_schema(spec.parameters.clone()),
                    })
                    .collect(),
            }]
        };

        let generation_config = if self.generation_config == GenerationConfig::default() {
            None
        } else {
            Some(self.generation_config.clone())
        };

        Ok(GenerateContentRequest {
            contents,
            system_instruction,
            tools,
            generation_config,
        })
    }

    async fn send(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmModel for ChatGoogleGenAI {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ModelError> {
        let request = self.build_request(messages, tools)?;
        tracing::debug!(
            model = %self.model,
            contents = request.contents.len(),
            tools = tools.len(),
            "调用 Gemini generateContent"
        );
        let response = retry_with_backoff(&self.retry, || self.send(&request)).await?;
        parse_response(response)
    }
}

/// Gemini 不接受 `$schema` 与 `additionalProperties` 等 JSON Schema 字段
fn sanitize_schema(mut schema: serde_json::Value) -> serde_json::Value {
    fn strip(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                map.remove("$schema");
                map.remove("additionalProperties");
                map.values_mut().for_each(strip);
            }
            serde_json::Value::Array(items) => items.iter_mut().for_each(strip),
            _ => {}
        }
    }
    strip(&mut schema);
    schema
}

/// 取第一个候选：拼接文本（忽略思考部分），收集工具调用
pub fn parse_response(response: GenerateContentResponse) -> Result<Message, ModelError> {
    if let Some(usage) = &response.usage_metadata {
        tracing::debug!(
            prompt_tokens = ?usage.prompt_token_count,
            completion_tokens = ?usage.candidates_token_count,
            total_tokens = ?usage.total_token_count,
            "Gemini token usage"
        );
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked: {}", reason))
            .unwrap_or_else(|| "response has no candidates".to_owned());
        return Err(ModelError::InvalidResponse(reason));
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.map(|content| content.parts).unwrap_or_default() {
        if part.is_thought() {
            continue;
        }
        if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
        if let Some(call) = part.function_call {
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            tool_calls.push(ToolCall::new(id, call.name, call.args));
        }
    }

    if text.is_empty() && tool_calls.is_empty() {
        tracing::warn!(
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN"),
            "Gemini 返回了空的回复"
        );
    }

    Ok(Message::assistant_with_tool_calls(text, tool_calls))
}
