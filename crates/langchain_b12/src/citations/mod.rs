//! 为聊天模型的回答添加引用
//!
//! 源文档以 `document` 内容块的形式放在对话里，按出现顺序编号。包装后的模型
//! 先生成回答，再让同一个模型指出每句话依据的原文，最后用近似匹配在文档中
//! 定位这些原文。返回的助手消息每句话一个文本块：
//!
//! ```json
//! {
//!     "type": "text",
//!     "text": "the grass is green",
//!     "citations": [{
//!         "cited_text": "The grass is green. ",
//!         "document_index": 0,
//!         "document_title": "My Document",
//!         "end_char_index": 20,
//!         "start_char_index": 0,
//!         "type": "char_location"
//!     }]
//! }
//! ```

mod claims;
mod document;
mod error;
mod fuzzy;
mod graph;
mod segment;

use std::sync::Arc;

use async_trait::async_trait;
use langchain_core::{LlmModel, Message, ModelError, ToolSpec};
use langgraph::{DEFAULT_MAX_STEPS, GraphRunnerError, NodeRunError, StateGraph};

pub use claims::{CITATION_SYSTEM_PROMPT, Claim, build_claims_prompt, parse_claims};
pub use document::{SourceDocument, collect_documents, render_documents};
pub use error::CitationError;
pub use fuzzy::{FuzzyMatch, find_near_match};
pub use graph::{
    CitationLabel, CitationState, CitationUpdate, SentenceCitation, add_citation,
    build_citation_graph, locate_claims,
};
pub use langchain_core::{Citation, message::CitationKind};
pub use segment::split_sentences;

#[derive(Debug, Clone)]
pub struct CitationConfig {
    /// 允许的编辑距离占引用原文长度的比例
    pub max_error_ratio: f64,
    /// 定位到的原文与模型引用之间的最低相似度（0~1）
    pub min_similarity: f64,
    pub system_prompt: String,
    pub max_steps: usize,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            max_error_ratio: 0.2,
            min_similarity: 0.7,
            system_prompt: CITATION_SYSTEM_PROMPT.to_owned(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl CitationConfig {
    pub fn with_max_error_ratio(mut self, ratio: f64) -> Self {
        self.max_error_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_min_similarity(mut self, similarity: f64) -> Self {
        self.min_similarity = similarity.clamp(0.0, 1.0);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

/// 给回答加引用的模型包装
pub struct CitationModel<M> {
    model: Arc<M>,
    graph: StateGraph<CitationState>,
    config: CitationConfig,
}

/// 包装一个聊天模型，使其返回带引用的助手消息
pub fn create_citation_model<M>(model: M) -> CitationModel<M>
where
    M: LlmModel + 'static,
{
    create_citation_model_with_config(model, CitationConfig::default())
}

pub fn create_citation_model_with_config<M>(model: M, config: CitationConfig) -> CitationModel<M>
where
    M: LlmModel + 'static,
{
    let model = Arc::new(model);
    let graph = build_citation_graph(model.clone(), &config);
    CitationModel {
        model,
        graph,
        config,
    }
}

impl<M> CitationModel<M> {
    pub fn inner(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &CitationConfig {
        &self.config
    }
}

fn into_model_error(error: GraphRunnerError) -> ModelError {
    match error {
        GraphRunnerError::NodeRun {
            source: NodeRunError::ModelError(error),
            ..
        } => error,
        other => ModelError::Other(other.to_string()),
    }
}

#[async_trait]
impl<M> LlmModel for CitationModel<M>
where
    M: LlmModel + 'static,
{
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ModelError> {
        let state = CitationState::new(messages.to_vec(), tools.to_vec());
        let state = self
            .graph
            .invoke(state, self.config.max_steps)
            .await
            .map_err(into_model_error)?;

        let needs_citations = state.needs_citations();
        let answer = state
            .answer
            .ok_or_else(|| ModelError::Other("citation graph produced no answer".to_owned()))?;
        if !needs_citations {
            return Ok(answer);
        }
        tracing::info!(
            documents = state.documents.len(),
            claims = state.claims.len(),
            citations = state.citations.len(),
            "引用定位完成"
        );
        Ok(add_citation(&answer, &state.citations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use langchain_core::{ContentBlock, FakeChatModel, MessageContent, ToolCall};
    use serde_json::json;

    fn question() -> Vec<Message> {
        vec![
            Message::system("Answer from the documents."),
            Message::user_blocks(vec![
                ContentBlock::document(
                    Some("My Document".to_owned()),
                    "The grass is green. The sky is blue.",
                ),
                ContentBlock::text("What color is the grass?"),
            ]),
        ]
    }

    #[tokio::test]
    async fn test_citation_model_adds_citations() {
        let fake = FakeChatModel::new([
            Message::assistant("The grass is green. That is all."),
            Message::assistant(
                "```json\n{\"citations\": [{\"sentence_index\": 0, \"document_index\": 0, \"cited_text\": \"the grass is green\"}]}\n```",
            ),
        ]);
        let model = create_citation_model(fake);

        let message = model.invoke(&question(), &[]).await.unwrap();
        assert_eq!(
            message,
            Message::assistant(vec![
                ContentBlock::Text {
                    text: "The grass is green. ".to_owned(),
                    citations: vec![Citation {
                        cited_text: "The grass is green".to_owned(),
                        document_index: 0,
                        document_title: "My Document".to_owned(),
                        end_char_index: 18,
                        start_char_index: 0,
                        kind: CitationKind::CharLocation,
                    }],
                },
                ContentBlock::text("That is all."),
            ])
        );

        let calls = model.inner().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0][1],
            Message::user_blocks(vec![
                ContentBlock::text(
                    "<document index=\"0\" title=\"My Document\">\nThe grass is green. The sky is blue.\n</document>"
                ),
                ContentBlock::text("What color is the grass?"),
            ])
        );
        assert_eq!(calls[1][0], Message::system(CITATION_SYSTEM_PROMPT));
        assert!(
            calls[1][1]
                .text()
                .contains("<sentence index=\"1\">That is all.</sentence>")
        );
    }

    #[tokio::test]
    async fn test_without_documents_answer_is_untouched() {
        let model = create_citation_model(FakeChatModel::new([Message::assistant("hello")]));
        let message = model.invoke(&[Message::user("hi")], &[]).await.unwrap();
        assert_eq!(message, Message::assistant("hello"));
        assert_eq!(model.inner().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_calls_skip_citation() {
        let answer = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("1", "search", json!({"q": "grass"}))],
        );
        let model = create_citation_model(FakeChatModel::new([answer.clone()]));
        let tools = [ToolSpec::new("search", "search", json!({"type": "object"}))];
        let message = model.invoke(&question(), &tools).await.unwrap();
        assert_eq!(message, answer);
        assert_eq!(model.inner().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unlocatable_claims_leave_plain_blocks() {
        let fake = FakeChatModel::new([
            Message::assistant("Grass is purple."),
            Message::assistant(
                "{\"citations\": [{\"sentence_index\": 0, \"document_index\": 0, \"cited_text\": \"Grass is purple and tall\"}]}",
            ),
        ]);
        let model = create_citation_model(fake);
        let message = model.invoke(&question(), &[]).await.unwrap();
        assert_eq!(
            message.content(),
            &MessageContent::Blocks(vec![ContentBlock::text("Grass is purple.")])
        );
    }

    #[tokio::test]
    async fn test_invalid_claims_fail() {
        let fake = FakeChatModel::new([
            Message::assistant("The grass is green."),
            Message::assistant("Sorry, I can't produce JSON."),
        ]);
        let model = create_citation_model(fake);
        let error = model.invoke(&question(), &[]).await.unwrap_err();
        assert!(error.to_string().contains("invalid citation claims"));
    }

    #[tokio::test]
    async fn test_model_error_is_propagated() {
        let fake = FakeChatModel::default();
        fake.push_error("quota exceeded");
        let model = create_citation_model(fake);
        let error = model.invoke(&question(), &[]).await.unwrap_err();
        assert!(matches!(error, ModelError::Other(message) if message == "quota exceeded"));
    }

    #[test]
    fn test_config_is_clamped() {
        let config = CitationConfig::default()
            .with_max_error_ratio(3.0)
            .with_min_similarity(-1.0)
            .with_system_prompt("quote it");
        assert_eq!(config.max_error_ratio, 1.0);
        assert_eq!(config.min_similarity, 0.0);
        assert_eq!(config.system_prompt, "quote it");
    }
}
