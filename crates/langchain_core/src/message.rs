use serde::{Deserialize, Deserializer, Serialize, de};

/// 对话消息，序列化时以 `role` 字段区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: MessageContent,
    },
    User {
        content: MessageContent,
    },
    Assistant {
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Tool {
        content: MessageContent,
        tool_call_id: String,
        /// 被调用工具的名称，部分供应商（如 Gemini）要求必须提供
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// 消息内容：纯文本，或多模态内容块列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        MessageContent::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        MessageContent::Text(value.to_owned())
    }
}

impl From<Vec<ContentBlock>> for MessageContent {
    fn from(value: Vec<ContentBlock>) -> Self {
        MessageContent::Blocks(value)
    }
}

impl MessageContent {
    /// 拼接所有文本内容，非文本块被忽略
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

/// 内容块，序列化时以 `type` 字段区分
///
/// 无法识别的类型保存在 [`ContentBlock::Unsupported`] 中，序列化时原样写回。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        citations: Vec<Citation>,
    },
    /// `url` 通常是 `data:{mime};base64,{payload}` 形式
    ImageUrl {
        image_url: ImageUrl,
    },
    /// 远程文件引用，例如 `gs://bucket/name`
    File {
        uri: String,
        mime_type: String,
    },
    /// 可被引用的源文档
    Document {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
    },
    #[serde(untagged)]
    Unsupported(serde_json::Value),
}

/// 已知类型的内容块，反序列化时先按 `type` 分流到这里
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownBlock {
    Text {
        text: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
    File {
        uri: String,
        mime_type: String,
    },
    Document {
        #[serde(default)]
        title: Option<String>,
        text: String,
    },
}

const KNOWN_BLOCK_TYPES: [&str; 4] = ["text", "image_url", "file", "document"];

impl From<KnownBlock> for ContentBlock {
    fn from(block: KnownBlock) -> Self {
        match block {
            KnownBlock::Text { text, citations } => ContentBlock::Text { text, citations },
            KnownBlock::ImageUrl { image_url } => ContentBlock::ImageUrl { image_url },
            KnownBlock::File { uri, mime_type } => ContentBlock::File { uri, mime_type },
            KnownBlock::Document { title, text } => ContentBlock::Document { title, text },
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| <D::Error as de::Error>::missing_field("type"))?;
        if !KNOWN_BLOCK_TYPES.contains(&kind) {
            return Ok(ContentBlock::Unsupported(value));
        }
        KnownBlock::deserialize(value)
            .map(ContentBlock::from)
            .map_err(de::Error::custom)
    }
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentBlock::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }

    pub fn file(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ContentBlock::File {
            uri: uri.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn document(title: Option<String>, text: impl Into<String>) -> Self {
        ContentBlock::Document {
            title,
            text: text.into(),
        }
    }

    /// 内容块的类型名，与序列化后的 `type` 字段一致
    pub fn kind(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::ImageUrl { .. } => "image_url",
            ContentBlock::File { .. } => "file",
            ContentBlock::Document { .. } => "document",
            ContentBlock::Unsupported(raw) => raw
                .get("type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// 指向源文档中一段文本的引用
///
/// 下标按 Unicode 字符计数，`end_char_index` 不包含在内。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub cited_text: String,
    pub document_index: usize,
    pub document_title: String,
    pub end_char_index: usize,
    pub start_char_index: usize,
    #[serde(rename = "type", default)]
    pub kind: CitationKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    #[default]
    CharLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn function_name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &serde_json::Value {
        &self.args
    }
}

impl Message {
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Message::User {
            content: MessageContent::Blocks(blocks),
        }
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<MessageContent>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        }
    }

    pub fn tool(content: impl Into<MessageContent>, tool_call_id: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
            name: None,
        }
    }

    pub fn tool_named(
        content: impl Into<MessageContent>,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
            name: Some(name.into()),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }

    pub fn content(&self) -> &MessageContent {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    pub fn text(&self) -> String {
        self.content().text()
    }

    /// 助手消息中的工具调用；其他消息返回空切片
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant {
                tool_calls: Some(calls),
                ..
            } => calls,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serde_shape() {
        let message = Message::tool_named("42", "call-1", "add");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({"role": "tool", "content": "42", "tool_call_id": "call-1", "name": "add"})
        );

        let parsed: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "look"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                {"type": "file", "uri": "gs://b/f.pdf", "mime_type": "application/pdf"}
            ]
        }))
        .unwrap();
        assert_eq!(
            parsed,
            Message::user_blocks(vec![
                ContentBlock::text("look"),
                ContentBlock::image_url("data:image/png;base64,AAAA"),
                ContentBlock::file("gs://b/f.pdf", "application/pdf"),
            ])
        );
    }

    #[test]
    fn test_unknown_block_type_is_kept() {
        let raw = json!({"type": "audio", "data": "..."});
        let parsed: MessageContent = serde_json::from_value(json!([raw.clone()])).unwrap();
        assert_eq!(
            parsed,
            MessageContent::Blocks(vec![ContentBlock::Unsupported(raw.clone())])
        );
        let MessageContent::Blocks(blocks) = &parsed else {
            unreachable!()
        };
        assert_eq!(blocks[0].kind(), "audio");
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!([raw]));
    }

    #[test]
    fn test_malformed_known_block_is_an_error() {
        assert!(serde_json::from_value::<ContentBlock>(json!({"type": "text"})).is_err());
        assert!(serde_json::from_value::<ContentBlock>(json!({"text": "no type"})).is_err());
    }

    #[test]
    fn test_citation_block_shape() {
        let block = ContentBlock::Text {
            text: "the grass is green".to_owned(),
            citations: vec![Citation {
                cited_text: "The grass is green. ".to_owned(),
                document_index: 0,
                document_title: "My Document".to_owned(),
                end_char_index: 20,
                start_char_index: 0,
                kind: CitationKind::CharLocation,
            }],
        };
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({
                "type": "text",
                "text": "the grass is green",
                "citations": [{
                    "cited_text": "The grass is green. ",
                    "document_index": 0,
                    "document_title": "My Document",
                    "end_char_index": 20,
                    "start_char_index": 0,
                    "type": "char_location"
                }]
            })
        );
    }

    #[test]
    fn test_text_concatenates_text_blocks() {
        let message = Message::user_blocks(vec![
            ContentBlock::text("a "),
            ContentBlock::file("gs://x", "text/plain"),
            ContentBlock::text("b"),
        ]);
        assert_eq!(message.text(), "a b");
        assert!(message.tool_calls().is_empty());
    }

    #[test]
    fn test_empty_tool_calls_are_dropped() {
        let message = Message::assistant_with_tool_calls("hi", Vec::new());
        assert_eq!(message, Message::assistant("hi"));
    }
}
