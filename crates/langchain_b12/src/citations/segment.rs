/// 把文本切分为句子
///
/// 句子在 `.`、`!`、`?`（其后为空白或文本结尾）、中文句末标点或换行处结束，
/// 紧随其后的空白归入前一句，因此所有句子拼接后与原文完全一致。
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' | '。' | '！' | '？' => true,
            '.' | '!' | '?' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if !boundary {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        sentences.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_trailing_whitespace() {
        let text = "The grass is green. The sky is blue!\nDone";
        let sentences = split_sentences(text);
        assert_eq!(sentences, vec!["The grass is green. ", "The sky is blue!\n", "Done"]);
        assert_eq!(sentences.concat(), text);
    }

    #[test]
    fn test_decimal_point_is_not_a_boundary() {
        assert_eq!(split_sentences("Pi is 3.14 today."), vec!["Pi is 3.14 today."]);
    }

    #[test]
    fn test_cjk_punctuation() {
        assert_eq!(split_sentences("草是绿的。天是蓝的。"), vec!["草是绿的。", "天是蓝的。"]);
    }

    #[test]
    fn test_empty_and_blank_lines() {
        assert!(split_sentences("").is_empty());
        let text = "One.\n\nTwo?";
        assert_eq!(split_sentences(text), vec!["One.\n\n", "Two?"]);
    }
}
