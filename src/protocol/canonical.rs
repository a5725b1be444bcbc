use serde::Serialize;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A discrete piece of model output handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePart {
    /// Visible assistant text.
    Text { text: String },
    /// Reasoning text, kept apart from the visible answer.
    Thinking {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<JsonObject>,
    },
    /// A complete function invocation with object arguments.
    ToolCall {
        id: String,
        name: String,
        arguments: JsonObject,
    },
}

impl ResponsePart {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        ResponsePart::Text { text: text.into() }
    }

    #[must_use]
    pub fn thinking(text: impl Into<String>) -> Self {
        ResponsePart::Thinking {
            text: text.into(),
            id: None,
            metadata: None,
        }
    }

    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self, ResponsePart::ToolCall { .. })
    }

    /// Text payload of a text or thinking part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponsePart::Text { text } | ResponsePart::Thinking { text, .. } => Some(text),
            ResponsePart::ToolCall { .. } => None,
        }
    }
}

/// Reason the model stopped generating, as reported on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// `stop` and `tool_calls` assert that the turn, including every tool
    /// call in it, is finished.
    #[must_use]
    pub fn completes_turn(&self) -> bool {
        matches!(self, FinishReason::Stop | FinishReason::ToolCalls)
    }
}

/// What a finished (or aborted) stream produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub text_parts: usize,
    pub thinking_parts: usize,
    pub tool_calls: usize,
    pub sink_failures: usize,
    pub finish_reason: Option<FinishReason>,
    pub saw_done: bool,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parts_serialize_with_type_tag() {
        let text = serde_json::to_value(ResponsePart::text("hi")).unwrap();
        assert_eq!(text, json!({"type": "text", "text": "hi"}));

        let thinking = serde_json::to_value(ResponsePart::thinking("hmm")).unwrap();
        assert_eq!(thinking, json!({"type": "thinking", "text": "hmm"}));

        let mut arguments = JsonObject::new();
        arguments.insert("q".into(), json!("x"));
        let call = serde_json::to_value(ResponsePart::ToolCall {
            id: "call_1".into(),
            name: "search".into(),
            arguments,
        })
        .unwrap();
        assert_eq!(
            call,
            json!({"type": "tool_call", "id": "call_1", "name": "search", "arguments": {"q": "x"}})
        );
    }

    #[test]
    fn only_stop_and_tool_calls_complete_the_turn() {
        assert!(FinishReason::Stop.completes_turn());
        assert!(FinishReason::ToolCalls.completes_turn());
        assert!(!FinishReason::Length.completes_turn());
        assert!(!FinishReason::ContentFilter.completes_turn());
        assert!(!FinishReason::Other("eos".into()).completes_turn());
    }

    #[test]
    fn as_text_covers_text_and_thinking() {
        assert_eq!(ResponsePart::text("a").as_text(), Some("a"));
        assert_eq!(ResponsePart::thinking("b").as_text(), Some("b"));
        let call = ResponsePart::ToolCall {
            id: String::new(),
            name: "f".into(),
            arguments: JsonObject::new(),
        };
        assert!(call.as_text().is_none());
        assert!(call.is_tool_call());
    }
}
