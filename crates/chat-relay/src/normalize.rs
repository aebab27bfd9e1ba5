//! Reply extraction from chat-completion responses.
//!
//! Providers disagree on the shape of `message.content`: most return a
//! string, some return an array of typed parts. Anything unrecognised
//! yields an empty reply rather than an error.

use crate::transport::UpstreamResponse;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<ReplyContent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplyContent {
    Text(String),
    Parts(Vec<Value>),
}

/// Extracts the reply text of the first choice in a response body.
///
/// Later choices are never inspected. A string content is returned verbatim.
/// An array content is reduced to the non-empty `text` fields of its parts,
/// joined with newlines.
pub fn extract_reply(body: &Value) -> String {
    let content = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|first| Choice::deserialize(first).ok())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);

    match content {
        Some(ReplyContent::Text(text)) => text,
        Some(ReplyContent::Parts(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        None => String::new(),
    }
}

impl UpstreamResponse {
    /// Shorthand for [`extract_reply`] on this response's body.
    pub fn reply_text(&self) -> String {
        extract_reply(&self.body)
    }
}
