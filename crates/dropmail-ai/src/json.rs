/// The first balanced top-level `{...}` block in `text`.
///
/// Braces inside JSON string literals are ignored, so prose or markdown
/// fences around the object do not confuse the scan.
#[must_use]
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence() {
        let text = "Sure!\n```json\n{\"success\": true, \"changes\": {}}\n```";
        assert_eq!(
            extract_json_block(text),
            Some("{\"success\": true, \"changes\": {}}")
        );
    }

    #[test]
    fn stops_at_first_top_level_object() {
        let text = r#"{"a": {"b": 1}} trailing {"c": 2}"#;
        assert_eq!(extract_json_block(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"{"explanation": "use {{MAIN_TITLE}} \"here\"", "x": 1}"#;
        assert_eq!(extract_json_block(text), Some(text));
    }

    #[test]
    fn unbalanced_or_missing_yields_none() {
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("{\"open\": 1"), None);
    }
}
