//! Lenient extraction of a JSON object from a model reply.
//!
//! Models wrap JSON in prose or markdown fences often enough that a strict
//! parse is not viable. Tried in order: the whole reply, each fenced code
//! block, then the span between the first `{` and the last `}`.

use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static RE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap());

pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();

    let direct = serde_json::from_str::<T>(trimmed);
    let direct_err = match direct {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for caps in RE_FENCE.captures_iter(trimmed) {
        if let Some(body) = caps.get(1) {
            if let Ok(value) = serde_json::from_str::<T>(body.as_str().trim()) {
                return Ok(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    tracing::debug!("Could not parse model reply as JSON: {}", trimmed);
    Err(direct_err).with_context(|| {
        format!(
            "model reply is not the expected JSON object: {}",
            trimmed.chars().take(200).collect::<String>()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        summary: String,
    }

    #[test]
    fn test_parse_clean_json() {
        let r: Reply = parse_json_reply(r#"{"summary": "変化を恐れない"}"#).unwrap();
        assert_eq!(r.summary, "変化を恐れない");
    }

    #[test]
    fn test_parse_code_block_wrapped() {
        let text = "以下です。\n```json\n{\"summary\": \"a\"}\n```\n以上。";
        let r: Reply = parse_json_reply(text).unwrap();
        assert_eq!(r.summary, "a");
    }

    #[test]
    fn test_parse_braces_in_prose() {
        let text = "Sure! {\"summary\": \"b\"} Hope that helps.";
        let r: Reply = parse_json_reply(text).unwrap();
        assert_eq!(r.summary, "b");
    }

    #[test]
    fn test_garbage_is_error() {
        let err = parse_json_reply::<Reply>("I don't know how to answer").unwrap_err();
        assert!(err.to_string().contains("not the expected JSON"));
        assert!(parse_json_reply::<Reply>(r#"{"other": 1}"#).is_err());
    }
}
