//! Helpers for pulling structured fragments out of model responses

/// Concatenate every segment enclosed by `start_tag` and `end_tag`.
///
/// Segments are joined by a single space and the result is trimmed. A start tag
/// without a matching end tag ends the scan. An empty start tag matches nothing.
pub fn extract_between(start_tag: &str, end_tag: &str, text: &str) -> String {
    let mut extracted = String::new();
    if start_tag.is_empty() {
        return extracted;
    }

    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(start_tag) {
        let content_start = cursor + offset + start_tag.len();
        let Some(length) = text[content_start..].find(end_tag) else {
            break;
        };

        let content_end = content_start + length;
        extracted.push_str(&text[content_start..content_end]);
        extracted.push(' ');
        cursor = content_end + end_tag.len();
    }

    extracted.trim().to_string()
}
