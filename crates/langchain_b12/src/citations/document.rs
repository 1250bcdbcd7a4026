use langchain_core::{ContentBlock, Message, MessageContent};

/// 可被引用的源文档，下标为其在对话中出现的顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub index: usize,
    pub title: String,
    pub text: String,
}

impl SourceDocument {
    pub fn render(&self) -> String {
        format!(
            "<document index=\"{}\" title=\"{}\">\n{}\n</document>",
            self.index,
            escape_attribute(&self.title),
            self.text
        )
    }
}

/// 转义属性值中会破坏标记的字符
fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// 按出现顺序收集消息中的 `document` 内容块
pub fn collect_documents(messages: &[Message]) -> Vec<SourceDocument> {
    messages
        .iter()
        .filter_map(|message| match message.content() {
            MessageContent::Blocks(blocks) => Some(blocks),
            MessageContent::Text(_) => None,
        })
        .flatten()
        .filter_map(|block| match block {
            ContentBlock::Document { title, text } => Some((title, text)),
            _ => None,
        })
        .enumerate()
        .map(|(index, (title, text))| SourceDocument {
            index,
            title: title.clone().unwrap_or_default(),
            text: text.clone(),
        })
        .collect()
}

/// 把 `document` 内容块改写成带编号的文本块，使任何模型都能读取
pub fn render_documents(messages: &[Message]) -> Vec<Message> {
    let mut index = 0;
    messages
        .iter()
        .map(|message| {
            let MessageContent::Blocks(blocks) = message.content() else {
                return message.clone();
            };
            let blocks = blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Document { title, text } => {
                        let document = SourceDocument {
                            index,
                            title: title.clone().unwrap_or_default(),
                            text: text.clone(),
                        };
                        index += 1;
                        ContentBlock::text(document.render())
                    }
                    other => other.clone(),
                })
                .collect();
            with_content(message, MessageContent::Blocks(blocks))
        })
        .collect()
}

fn with_content(message: &Message, content: MessageContent) -> Message {
    match message {
        Message::System { .. } => Message::System { content },
        Message::User { .. } => Message::User { content },
        Message::Assistant { tool_calls, .. } => Message::Assistant {
            content,
            tool_calls: tool_calls.clone(),
        },
        Message::Tool {
            tool_call_id, name, ..
        } => Message::Tool {
            content,
            tool_call_id: tool_call_id.clone(),
            name: name.clone(),
        },
    }
}
