//! Bracket-scanning JSON extraction (Design Notes §9: "accept the first JSON
//! object found via bracket-scanning, validate against a schema, and on
//! failure apply the documented fallback"). LLM output is treated as
//! untrusted text that may wrap a JSON object in prose, code fences, or
//! partial thinking-model output.

/// Scan `text` for the first balanced `{...}` or `[...]` object, skipping
/// braces that occur inside string literals, and return its slice. Returns
/// `None` if no balanced bracket run is found.
pub fn extract_first_json(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = None;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    let mut open: u8 = b'{';
    let mut close: u8 = b'}';

    for (i, &b) in bytes.iter().enumerate() {
        if start.is_none() {
            if b == b'{' || b == b'[' {
                start = Some(i);
                open = b;
                close = if b == b'{' { b'}' } else { b']' };
                depth = 1;
            }
            continue;
        }

        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    let s = start.unwrap();
                    return text.get(s..=i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the first JSON object/array and parse it as a [`serde_json::Value`].
pub fn parse_first_json(text: &str) -> Option<serde_json::Value> {
    extract_first_json(text).and_then(|s| serde_json::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let text = "Sure, here's the outline:\n```json\n{\"a\": 1, \"b\": [1,2]}\n```\nLet me know!";
        assert_eq!(
            parse_first_json(text),
            Some(json!({"a": 1, "b": [1, 2]}))
        );
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"{"note": "contains a } brace", "n": 2}"#;
        assert_eq!(
            parse_first_json(text),
            Some(json!({"note": "contains a } brace", "n": 2}))
        );
    }

    #[test]
    fn extracts_top_level_array() {
        let text = "result: [1, 2, 3] done";
        assert_eq!(parse_first_json(text), Some(json!([1, 2, 3])));
    }

    #[test]
    fn no_json_returns_none() {
        assert_eq!(parse_first_json("no structure here"), None);
    }

    #[test]
    fn unbalanced_braces_return_none() {
        assert_eq!(extract_first_json("{ \"a\": 1"), None);
    }

    #[test]
    fn escaped_quote_inside_string_does_not_end_string_early() {
        let text = r#"{"title": "She said \"hi\" } there", "ok": true}"#;
        assert!(parse_first_json(text).is_some());
    }
}
