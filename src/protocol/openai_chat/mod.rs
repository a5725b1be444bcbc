pub mod stream;

use serde::{Deserialize, Serialize};

use crate::protocol::canonical::JsonObject;

/// A streaming chunk (`chat.completion.chunk`).
///
/// Only the fields the decoder consumes are modelled; everything else on the
/// wire is ignored. `choices` is absent on usage-only chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
}

/// A choice within a stream chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: OpenAiDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Delta content within a stream choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiStreamToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<ThinkingDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ThinkingDelta>,
}

impl OpenAiDelta {
    /// The reasoning channel of this delta: `thinking`, falling back to the
    /// `reasoning_content` and `reasoning` spellings used by other servers.
    #[must_use]
    pub fn thinking_field(&self) -> Option<&ThinkingDelta> {
        self.thinking
            .as_ref()
            .or(self.reasoning_content.as_ref())
            .or(self.reasoning.as_ref())
    }

    /// Owned variant of [`Self::thinking_field`]; clears all three fields.
    pub fn take_thinking(&mut self) -> Option<ThinkingDelta> {
        let thinking = self.thinking.take();
        let reasoning_content = self.reasoning_content.take();
        let reasoning = self.reasoning.take();
        thinking.or(reasoning_content).or(reasoning)
    }
}

/// The `thinking` field of a delta.
///
/// Decoded leniently: a payload that matches neither accepted shape is kept
/// as raw JSON instead of rejecting the whole chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThinkingDelta {
    Text(String),
    Block(ThinkingBlock),
    Unrecognized(serde_json::Value),
}

/// Structured thinking payload: `{ "text": ..., "id"?: ..., "metadata"?: {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonObject>,
}

/// A tool call fragment in streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiStreamToolCall {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<OpenAiStreamFunction>,
}

/// Function part of a streamed tool call fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiStreamFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
