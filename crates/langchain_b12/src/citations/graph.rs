use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use langchain_core::{
    Citation, ContentBlock, LlmModel, Message, MessageContent, ToolSpec,
    message::CitationKind,
};
use langgraph::{
    BaseAgentLabel, GraphLabel, GraphState, InternedGraphLabel, Node, NodeRunError,
    StateGraph, graph_label,
};

use super::{
    CitationConfig,
    claims::{Claim, build_claims_prompt, parse_claims},
    document::{SourceDocument, collect_documents, render_documents},
    fuzzy::find_near_match,
    segment::split_sentences,
};

graph_label! {
    pub enum CitationLabel {
        Generate,
        ExtractClaims,
        Locate,
    }
}

/// 已在源文档中定位到的引用，归属于回答的第 `sentence_index` 句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceCitation {
    pub sentence_index: usize,
    pub citation: Citation,
}

#[derive(Debug, Clone, Default)]
pub struct CitationState {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub documents: Vec<SourceDocument>,
    pub answer: Option<Message>,
    pub claims: Vec<Claim>,
    pub citations: Vec<SentenceCitation>,
}

impl CitationState {
    pub fn new(messages: Vec<Message>, tools: Vec<ToolSpec>) -> Self {
        let documents = collect_documents(&messages);
        Self {
            messages,
            tools,
            documents,
            ..Self::default()
        }
    }

    /// 回答是纯文本且对话里有文档时才需要引用
    pub fn needs_citations(&self) -> bool {
        match &self.answer {
            Some(answer) => {
                !self.documents.is_empty()
                    && answer.tool_calls().is_empty()
                    && !answer.text().trim().is_empty()
            }
            None => false,
        }
    }
}

pub enum CitationUpdate {
    Answer(Message),
    Claims(Vec<Claim>),
    Citations(Vec<SentenceCitation>),
}

impl GraphState for CitationState {
    type Update = CitationUpdate;

    fn apply(&mut self, update: CitationUpdate) {
        match update {
            CitationUpdate::Answer(answer) => self.answer = Some(answer),
            CitationUpdate::Claims(claims) => self.claims = claims,
            CitationUpdate::Citations(citations) => self.citations = citations,
        }
    }
}

struct GenerateNode<M> {
    model: Arc<M>,
}

#[async_trait]
impl<M> Node<CitationState> for GenerateNode<M>
where
    M: LlmModel + 'static,
{
    async fn run(&self, state: &CitationState) -> Result<CitationUpdate, NodeRunError> {
        let messages = render_documents(&state.messages);
        tracing::debug!(documents = state.documents.len(), "生成回答");
        let answer = self.model.invoke(&messages, &state.tools).await?;
        Ok(CitationUpdate::Answer(answer))
    }
}

struct ExtractClaimsNode<M> {
    model: Arc<M>,
    system_prompt: String,
}

#[async_trait]
impl<M> Node<CitationState> for ExtractClaimsNode<M>
where
    M: LlmModel + 'static,
{
    async fn run(&self, state: &CitationState) -> Result<CitationUpdate, NodeRunError> {
        let answer = state.answer.as_ref().map(Message::text).unwrap_or_default();
        let sentences = split_sentences(&answer);
        let prompt = build_claims_prompt(&state.documents, &sentences);
        let messages = [
            Message::system(self.system_prompt.clone()),
            Message::user(prompt),
        ];
        let reply = self.model.invoke(&messages, &[]).await?;
        let claims = parse_claims(&reply.text())?;
        tracing::debug!(claims = claims.len(), sentences = sentences.len(), "解析引用声明");
        Ok(CitationUpdate::Claims(claims))
    }
}

struct LocateNode {
    max_error_ratio: f64,
    min_similarity: f64,
}

#[async_trait]
impl Node<CitationState> for LocateNode {
    async fn run(&self, state: &CitationState) -> Result<CitationUpdate, NodeRunError> {
        let answer = state.answer.as_ref().map(Message::text).unwrap_or_default();
        let sentence_count = split_sentences(&answer).len();
        Ok(CitationUpdate::Citations(locate_claims(
            &state.claims,
            &state.documents,
            sentence_count,
            self.max_error_ratio,
            self.min_similarity,
        )))
    }
}

/// 在源文档中定位每条声明引用的原文
///
/// 下标越界、找不到足够相近的原文、或与已有结果重复的声明会被丢弃。
pub fn locate_claims(
    claims: &[Claim],
    documents: &[SourceDocument],
    sentence_count: usize,
    max_error_ratio: f64,
    min_similarity: f64,
) -> Vec<SentenceCitation> {
    let mut seen = HashSet::new();
    let mut located = Vec::new();

    for claim in claims {
        if claim.sentence_index >= sentence_count {
            tracing::debug!(sentence = claim.sentence_index, "引用声明的句子下标越界");
            continue;
        }
        let Some(document) = documents.get(claim.document_index) else {
            tracing::debug!(document = claim.document_index, "引用声明的文档下标越界");
            continue;
        };
        let needle = claim.cited_text.trim();
        if needle.is_empty() {
            continue;
        }

        let max_distance = (needle.chars().count() as f64 * max_error_ratio).floor() as usize;
        let Some(found) = find_near_match(needle, &document.text, max_distance) else {
            tracing::warn!(
                document = document.index,
                cited_text = needle,
                "在文档中找不到引用的原文"
            );
            continue;
        };

        let cited_text: String = document
            .text
            .chars()
            .skip(found.start)
            .take(found.len())
            .collect();
        let similarity =
            strsim::normalized_levenshtein(&needle.to_lowercase(), &cited_text.to_lowercase());
        if similarity < min_similarity {
            tracing::warn!(
                document = document.index,
                similarity,
                cited_text = needle,
                "引用原文相似度过低"
            );
            continue;
        }

        if !seen.insert((claim.sentence_index, document.index, found.start, found.end)) {
            continue;
        }
        located.push(SentenceCitation {
            sentence_index: claim.sentence_index,
            citation: Citation {
                cited_text,
                document_index: document.index,
                document_title: document.title.clone(),
                end_char_index: found.end,
                start_char_index: found.start,
                kind: CitationKind::CharLocation,
            },
        });
    }

    located
}

/// 把消息按句切分，每句一个文本块，并挂上属于该句的引用
///
/// 返回的总是助手消息，原消息的工具调用会被保留。
pub fn add_citation(message: &Message, citations: &[SentenceCitation]) -> Message {
    let text = message.text();
    let blocks: Vec<ContentBlock> = split_sentences(&text)
        .into_iter()
        .enumerate()
        .map(|(index, sentence)| ContentBlock::Text {
            text: sentence.to_owned(),
            citations: citations
                .iter()
                .filter(|located| located.sentence_index == index)
                .map(|located| located.citation.clone())
                .collect(),
        })
        .collect();

    let content = if blocks.is_empty() {
        MessageContent::Text(String::new())
    } else {
        MessageContent::Blocks(blocks)
    };
    Message::assistant_with_tool_calls(content, message.tool_calls().to_vec())
}

fn route_after_generate(state: &CitationState) -> InternedGraphLabel {
    if state.needs_citations() {
        CitationLabel::ExtractClaims.intern()
    } else {
        BaseAgentLabel::End.intern()
    }
}

pub fn build_citation_graph<M>(model: Arc<M>, config: &CitationConfig) -> StateGraph<CitationState>
where
    M: LlmModel + 'static,
{
    let mut graph = StateGraph::<CitationState>::default();

    graph
        .add_node(
            CitationLabel::Generate,
            GenerateNode {
                model: model.clone(),
            },
        )
        .add_node(
            CitationLabel::ExtractClaims,
            ExtractClaimsNode {
                model,
                system_prompt: config.system_prompt.clone(),
            },
        )
        .add_node(
            CitationLabel::Locate,
            LocateNode {
                max_error_ratio: config.max_error_ratio,
                min_similarity: config.min_similarity,
            },
        );

    graph
        .set_start(BaseAgentLabel::Start)
        .set_end(BaseAgentLabel::End)
        .add_node_edge(BaseAgentLabel::Start, CitationLabel::Generate)
        .add_condition_edge(CitationLabel::Generate, route_after_generate)
        .add_node_edge(CitationLabel::ExtractClaims, CitationLabel::Locate)
        .add_node_edge(CitationLabel::Locate, BaseAgentLabel::End);

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use langchain_core::ToolCall;
    use serde_json::json;

    fn documents() -> Vec<SourceDocument> {
        vec![
            SourceDocument {
                index: 0,
                title: "My Document".to_owned(),
                text: "The grass is green. The sky is blue.".to_owned(),
            },
            SourceDocument {
                index: 1,
                title: "Other".to_owned(),
                text: "Water boils at 100 degrees.".to_owned(),
            },
        ]
    }

    fn claim(sentence_index: usize, document_index: usize, cited_text: &str) -> Claim {
        Claim {
            sentence_index,
            document_index,
            cited_text: cited_text.to_owned(),
        }
    }

    #[test]
    fn test_locate_exact_and_fuzzy_claims() {
        let located = locate_claims(
            &[
                claim(0, 0, "The grass is green. "),
                claim(1, 1, "water boils at 100 degres"),
            ],
            &documents(),
            2,
            0.2,
            0.7,
        );
        assert_eq!(located.len(), 2);
        assert_eq!(
            located[0].citation,
            Citation {
                cited_text: "The grass is green.".to_owned(),
                document_index: 0,
                document_title: "My Document".to_owned(),
                end_char_index: 19,
                start_char_index: 0,
                kind: CitationKind::CharLocation,
            }
        );
        assert_eq!(located[1].sentence_index, 1);
        assert_eq!(located[1].citation.cited_text, "Water boils at 100 degrees");
        assert_eq!(located[1].citation.start_char_index, 0);
    }

    #[test]
    fn test_locate_skips_invalid_claims() {
        let located = locate_claims(
            &[
                claim(5, 0, "The grass is green."),
                claim(0, 9, "The grass is green."),
                claim(0, 0, "   "),
                claim(0, 0, "Cats are mammals."),
                claim(0, 0, "the sky is blue"),
                claim(0, 0, "The sky is blue"),
            ],
            &documents(),
            1,
            0.2,
            0.7,
        );
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].citation.start_char_index, 20);
        assert_eq!(located[0].citation.end_char_index, 35);
    }

    #[test]
    fn test_add_citation_splits_sentences() {
        let citation = Citation {
            cited_text: "The grass is green.".to_owned(),
            document_index: 0,
            document_title: "My Document".to_owned(),
            end_char_index: 19,
            start_char_index: 0,
            kind: CitationKind::CharLocation,
        };
        let message = add_citation(
            &Message::assistant("Grass is green. Nothing else."),
            &[SentenceCitation {
                sentence_index: 0,
                citation: citation.clone(),
            }],
        );
        assert_eq!(
            message,
            Message::assistant(vec![
                ContentBlock::Text {
                    text: "Grass is green. ".to_owned(),
                    citations: vec![citation],
                },
                ContentBlock::text("Nothing else."),
            ])
        );
    }

    #[test]
    fn test_add_citation_keeps_tool_calls_and_handles_empty_text() {
        let call = ToolCall::new("1", "search", json!({"q": "grass"}));
        let message = add_citation(
            &Message::assistant_with_tool_calls("", vec![call.clone()]),
            &[],
        );
        assert_eq!(message, Message::assistant_with_tool_calls("", vec![call]));

        let message = add_citation(&Message::user("hi"), &[]);
        assert_eq!(message, Message::assistant(vec![ContentBlock::text("hi")]));
    }

    #[test]
    fn test_needs_citations() {
        let mut state = CitationState::new(
            vec![Message::user_blocks(vec![ContentBlock::document(None, "doc")])],
            Vec::new(),
        );
        assert!(!state.needs_citations());
        state.apply(CitationUpdate::Answer(Message::assistant("answer")));
        assert!(state.needs_citations());
        state.apply(CitationUpdate::Answer(Message::assistant(" \n")));
        assert!(!state.needs_citations());
        state.apply(CitationUpdate::Answer(Message::assistant_with_tool_calls(
            "calling",
            vec![ToolCall::new("1", "search", json!({}))],
        )));
        assert!(!state.needs_citations());

        let state = CitationState {
            answer: Some(Message::assistant("answer")),
            ..CitationState::default()
        };
        assert!(!state.needs_citations());
    }
}
