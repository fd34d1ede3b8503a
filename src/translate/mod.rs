// LLM translation layer
//
// The service trait isolates the wire protocol so the batch logic can be
// exercised against a mock. `ChatService` is the production implementation
// speaking the OpenAI-compatible chat completion protocol.

pub mod batch;
pub mod openai;

pub use batch::{BatchOutcome, BatchTranslator};
pub use openai::ChatService;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{PacklingoError, Result};

/// A chat completion backend. Takes the fixed system instruction and the
/// batch payload, returns the raw assistant message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_payload: &str) -> Result<String>;
}

/// Fixed translation instruction. `{target_lang}` and `{dict_context}` are
/// substituted per batch.
const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are a professional translator for Minecraft mods and modpacks. \
Translate the given English texts to the target language `{target_lang}`.

Rules:
1. Preserve all formatting codes: `\u{a7}` color codes (`\u{a7}a`, `\u{a7}l`, `\u{a7}r`), `&` color codes, and Minecraft format markup.
2. Preserve all placeholders exactly: `%s`, `%d`, `%1$s`, `%2$d`, `{0}`, `{1}` and similar.
3. Preserve technical markup: JSON escapes and `\\n` line breaks.
4. Item, block and entity names should follow community terminology; keep the English text when unsure.
5. Do not translate: pure numbers and punctuation, commands starting with `/`, variable names such as `player_name`, resource paths such as `minecraft:stone`, or text already in the target language.
6. Keep translations concise and natural.

Reference dictionary entries:

{dict_context}

The input is a JSON object mapping translation keys to English texts. \
Output a JSON object with the same keys and the translated values. \
Output only the JSON object, nothing else.";

/// Render the system instruction for one batch.
pub fn build_system_prompt(target_lang: &str, dict_context: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{target_lang}", target_lang)
        .replace("{dict_context}", dict_context)
}

/// Serialize a batch as the user payload: an ordered JSON object of
/// key -> source text.
pub fn build_user_payload(batch: &[(String, String)]) -> String {
    let mut map = serde_json::Map::with_capacity(batch.len());
    for (key, text) in batch {
        map.insert(key.clone(), serde_json::Value::String(text.clone()));
    }
    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
}

/// Strip surrounding markdown code fences the service may wrap the JSON in.
pub fn strip_code_fences(content: &str) -> String {
    let content = content.trim();
    if !content.starts_with("```") {
        return content.to_string();
    }

    let mut lines: Vec<&str> = content.lines().collect();
    // Drop the opening fence (possibly carrying a language tag).
    lines.remove(0);
    if matches!(lines.last(), Some(last) if last.trim() == "```") {
        lines.pop();
    }
    lines.join("\n")
}

/// Parse an assistant message as a key -> translated text mapping.
/// Anything that is not a JSON object is a parse failure; non-string
/// values within the object are dropped.
pub fn parse_translation_response(content: &str) -> Result<HashMap<String, String>> {
    let cleaned = strip_code_fences(content);
    let value: serde_json::Value = serde_json::from_str(&cleaned)?;

    match value {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect()),
        _ => Err(PacklingoError::Translation(
            "Response is not a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_code_fence() {
        let content = "```\n{\"a\": \"b\"}\n```";
        assert_eq!(strip_code_fences(content), "{\"a\": \"b\"}");
    }

    #[test]
    fn test_strip_json_tagged_fence() {
        let content = "```json\n{\"a\": \"b\"}\n```";
        assert_eq!(strip_code_fences(content), "{\"a\": \"b\"}");
    }

    #[test]
    fn test_unfenced_content_is_untouched() {
        let content = "{\"a\": \"b\"}";
        assert_eq!(strip_code_fences(content), content);
    }

    #[test]
    fn test_parse_fenced_mapping() {
        let parsed =
            parse_translation_response("```json\n{\"key.a\": \"\u{4f60}\u{597d}\"}\n```").unwrap();
        assert_eq!(parsed.get("key.a").map(String::as_str), Some("你好"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_translation_response("[1, 2, 3]").is_err());
        assert!(parse_translation_response("not json").is_err());
        assert!(parse_translation_response("\"just a string\"").is_err());
    }

    #[test]
    fn test_parse_drops_non_string_values() {
        let parsed = parse_translation_response("{\"a\": \"ok\", \"b\": 42}").unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("a"));
    }

    #[test]
    fn test_user_payload_preserves_order() {
        let batch = vec![
            ("z.key".to_string(), "Z".to_string()),
            ("a.key".to_string(), "A".to_string()),
        ];
        let payload = build_user_payload(&batch);
        let z_pos = payload.find("z.key").unwrap();
        let a_pos = payload.find("a.key").unwrap();
        assert!(z_pos < a_pos);
    }

    #[test]
    fn test_system_prompt_substitution() {
        let prompt = build_system_prompt("zh_cn", "- Iron → 铁");
        assert!(prompt.contains("`zh_cn`"));
        assert!(prompt.contains("- Iron → 铁"));
        assert!(!prompt.contains("{target_lang}"));
        assert!(!prompt.contains("{dict_context}"));
    }
}
