//! Latest-question extraction from chat histories

use serde::Deserialize;
use serde_json::Value;

use crate::error::ChatError;

/// One turn of the caller-supplied history. Content arrives either as a
/// plain string or as typed parts; both shapes are read-only here.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub parts: Option<Vec<Value>>,
}

/// Finds the most recent user turn and reduces it to plain text, falling
/// back to the request's raw `input` field. An empty result is a 400.
pub fn extract_question(
    messages: &[ConversationTurn],
    input: Option<&str>,
) -> Result<String, ChatError> {
    messages
        .iter()
        .rev()
        .find(|turn| turn.role == "user")
        .and_then(turn_text)
        .filter(|question| !question.trim().is_empty())
        .or_else(|| {
            input
                .map(str::to_string)
                .filter(|raw| !raw.trim().is_empty())
        })
        .ok_or(ChatError::MissingQuestion)
}

/// Reduces a turn to plain text: text-typed parts concatenated in order
/// with no separator, else the string content as-is. Empty reductions are
/// treated as absent.
pub fn turn_text(turn: &ConversationTurn) -> Option<String> {
    if let Some(parts) = turn.parts.as_ref() {
        let mut combined = String::new();
        for part in parts {
            if part.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    combined.push_str(text);
                }
            }
        }
        if !combined.is_empty() {
            return Some(combined);
        }
    }
    match turn.content.as_ref() {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}
