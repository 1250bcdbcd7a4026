//! langchain 消息到 Gemini `Content` 的转换

use base64::{Engine, engine::general_purpose::STANDARD};
use langchain_core::{ContentBlock, Message, MessageContent};
use serde_json::json;

use crate::{
    error::ConversionError,
    types::{Content, FunctionCall, FunctionResponse, Part, Role},
};

/// 将多模态内容块转换为 Gemini `Part`
///
/// 支持的内容块：
/// - `text`：空文本会被跳过
/// - `image_url`：必须是 `data:{mime_type};base64,{data}` 形式的 data url
/// - `file`：以 `uri` + `mime_type` 引用远程文件，例如 `gs://bucket/file.pdf`
pub fn multi_content_to_part(contents: &[ContentBlock]) -> Result<Vec<Part>, ConversionError> {
    let mut parts = Vec::with_capacity(contents.len());
    for content in contents {
        match content {
            ContentBlock::Text { text, .. } => {
                if !text.is_empty() {
                    parts.push(Part::text(text.clone()));
                }
            }
            ContentBlock::ImageUrl { image_url } => {
                let (mime_type, data) = decode_data_url(&image_url.url)?;
                parts.push(Part::from_bytes(data, mime_type));
            }
            ContentBlock::File { uri, mime_type } => {
                parts.push(Part::from_uri(uri.clone(), mime_type.clone()));
            }
            other => return Err(ConversionError::UnsupportedContent(other.kind().to_owned())),
        }
    }
    Ok(parts)
}

/// 解析 data url，返回 (mime_type, 解码后的字节)
fn decode_data_url(url: &str) -> Result<(&str, Vec<u8>), ConversionError> {
    let (header, encoded) = url
        .split_once(',')
        .ok_or_else(|| ConversionError::InvalidDataUrl("missing ',' separator".to_owned()))?;
    let (_, media) = header
        .split_once(':')
        .ok_or_else(|| ConversionError::InvalidDataUrl("missing ':' in header".to_owned()))?;
    let mime_type = media.split_once(';').map_or(media, |(mime, _)| mime);
    if mime_type.is_empty() {
        return Err(ConversionError::InvalidDataUrl("missing mime type".to_owned()));
    }
    let data = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConversionError::InvalidDataUrl(e.to_string()))?;
    Ok((mime_type, data))
}

/// 将单条消息的内容转换为 `Part` 列表，空字符串内容不产生任何 part
pub fn convert_message_to_parts(message: &Message) -> Result<Vec<Part>, ConversionError> {
    match message.content() {
        MessageContent::Text(text) if text.is_empty() => Ok(Vec::new()),
        MessageContent::Text(text) => Ok(vec![Part::text(text.clone())]),
        MessageContent::Blocks(blocks) => multi_content_to_part(blocks),
    }
}

/// 将一组消息转换为 Gemini `Content` 列表
///
/// - 用户消息 -> `user`
/// - 助手消息 -> `model`，文本在前，随后每个工具调用一个 `functionCall`
/// - 工具消息 -> `function`，内容包装为 `{"output": ...}`
///
/// 系统消息不能出现在这里，应通过 `systemInstruction` 单独传递。
pub fn convert_messages_to_contents(
    messages: &[Message],
) -> Result<Vec<Content>, ConversionError> {
    let mut contents = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::User { .. } => {
                contents.push(Content::user(convert_message_to_parts(message)?));
            }
            Message::Assistant { .. } => {
                let mut parts = convert_message_to_parts(message)?;
                for call in message.tool_calls() {
                    if call.id.is_empty() {
                        return Err(ConversionError::MissingToolCallId);
                    }
                    parts.push(Part::from_function_call(FunctionCall {
                        id: Some(call.id.clone()),
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }));
                }
                contents.push(Content::model(parts));
            }
            Message::Tool {
                content,
                tool_call_id,
                name,
            } => {
                // functionCall 和 functionResponse 不能放在同一个 Content 里，否则接口返回 4xx
                let MessageContent::Text(output) = content else {
                    return Err(ConversionError::ExpectedTextContent);
                };
                let name = name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .ok_or(ConversionError::MissingToolName)?;
                contents.push(Content::new(
                    Role::Function,
                    vec![Part::from_function_response(FunctionResponse {
                        id: Some(tool_call_id.clone()),
                        name: name.to_owned(),
                        response: json!({ "output": output }),
                    })],
                ));
            }
            Message::System { .. } => {
                return Err(ConversionError::InvalidMessageType(
                    message.role().to_owned(),
                ));
            }
        }
    }

    Ok(contents)
}
