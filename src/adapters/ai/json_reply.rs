//! Pulls a JSON value out of a model reply that may be fenced or prefixed
//! with prose.

use serde_json::Value;

use crate::ports::CapabilityError;

/// Parses the first JSON object or array in `reply`.
pub fn parse_json_reply(reply: &str) -> Result<Value, CapabilityError> {
    let candidate = locate_json(reply.trim());
    serde_json::from_str(&candidate)
        .map_err(|e| CapabilityError::invalid_response(format!("reply is not JSON: {}", e)))
}

fn locate_json(s: &str) -> String {
    if let Some(json) = from_code_block(s) {
        return json;
    }

    let start = match (s.find('{'), s.find('[')) {
        (Some(o), Some(a)) => Some(if a < o { (a, '[', ']') } else { (o, '{', '}') }),
        (Some(o), None) => Some((o, '{', '}')),
        (None, Some(a)) => Some((a, '[', ']')),
        (None, None) => None,
    };

    start
        .and_then(|(at, open, close)| balanced(s, at, open, close))
        .unwrap_or_else(|| s.to_string())
}

fn from_code_block(s: &str) -> Option<String> {
    for fence in ["```json", "```"] {
        if let Some(start) = s.find(fence) {
            let body_start = start + fence.len();
            if let Some(end) = s[body_start..].find("```") {
                return Some(s[body_start..body_start + end].trim().to_string());
            }
        }
    }
    None
}

fn balanced(s: &str, start: usize, open: char, close: char) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(s[start..end].to_string());
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
    use serde_json::json;

    #[test]
    fn parses_bare_object() {
        assert_eq!(parse_json_reply(r#"{"intent": "log"}"#).unwrap(), json!({"intent": "log"}));
    }

    #[test]
    fn parses_fenced_json() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(parse_json_reply(reply).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn parses_object_after_preamble() {
        let reply = "Sure! {\"note\": \"a } inside\", \"n\": [1, 2]} trailing";
        assert_eq!(
            parse_json_reply(reply).unwrap(),
            json!({"note": "a } inside", "n": [1, 2]})
        );
    }

    #[test]
    fn handles_multibyte_text_before_json() {
        let reply = "Voilà — {\"ok\": true}";
        assert_eq!(parse_json_reply(reply).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_json_reply("no json here"),
            Err(CapabilityError::InvalidResponse(_))
        ));
    }
}
