//! 让模型指出回答中每句话依据的原文，并解析它的 JSON 输出

use serde::{Deserialize, Serialize};

use super::{document::SourceDocument, error::CitationError};

pub const CITATION_SYSTEM_PROMPT: &str = "\
You verify answers against source documents. For every answer sentence that is \
supported by a document, quote the exact supporting passage from that document. \
Copy the passage verbatim, do not paraphrase, and keep each quote to at most a \
few sentences. Skip sentences that no document supports.

Reply with JSON only, in this shape:
{\"citations\": [{\"sentence_index\": 0, \"document_index\": 0, \"cited_text\": \"...\"}]}
Reply with {\"citations\": []} when nothing is supported.";

/// 模型给出的一条引用声明：第 `sentence_index` 句出自第 `document_index` 篇文档
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub sentence_index: usize,
    pub document_index: usize,
    pub cited_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClaimPayload {
    Wrapped { citations: Vec<Claim> },
    Bare(Vec<Claim>),
}

pub fn build_claims_prompt(documents: &[SourceDocument], sentences: &[&str]) -> String {
    let mut prompt = String::from("Documents:\n");
    for document in documents {
        prompt.push_str(&document.render());
        prompt.push('\n');
    }
    prompt.push_str("\nAnswer sentences:\n");
    for (index, sentence) in sentences.iter().enumerate() {
        prompt.push_str(&format!(
            "<sentence index=\"{}\">{}</sentence>\n",
            index,
            sentence.trim()
        ));
    }
    prompt
}

/// 解析模型回复，容忍 Markdown 代码块以及 JSON 前后的说明文字
///
/// 从每个 `{` / `[` 处尝试读取一个 JSON 值，取第一个能解析成引用列表的。
/// 空回复和不含 `citations` 字段的对象都视为无效。
pub fn parse_claims(raw: &str) -> Result<Vec<Claim>, CitationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CitationError::InvalidClaims("empty reply".to_owned()));
    }

    let mut last_error = None;
    for (start, _) in trimmed.match_indices(['{', '[']) {
        let mut values =
            serde_json::Deserializer::from_str(&trimmed[start..]).into_iter::<ClaimPayload>();
        match values.next() {
            Some(Ok(ClaimPayload::Wrapped { citations })) => return Ok(citations),
            Some(Ok(ClaimPayload::Bare(citations))) => return Ok(citations),
            Some(Err(e)) => last_error = Some(e.to_string()),
            None => {}
        }
    }

    Err(CitationError::InvalidClaims(match last_error {
        Some(error) => error,
        None => format!("no JSON found in {:?}", trimmed),
    }))
}
