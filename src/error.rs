use crate::config::ConfigError;

/// Errors that abort decoding of a response stream.
///
/// Everything else (malformed event lines, half-built tool calls at `[DONE]`,
/// a sink rejecting a single part) is contained inside the decoder and only
/// logged.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The server finished the turn (`finish_reason` of `stop`/`tool_calls`)
    /// while a buffered tool call was still unusable.
    #[error(
        "Turn finished with unusable tool call at index {index} (name={}, arguments={arguments:?})",
        .name.as_deref().unwrap_or("<missing>")
    )]
    IncompleteToolCall {
        index: u32,
        name: Option<String>,
        arguments: String,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Error returned by a [`PartSink`](crate::stream::PartSink) that could not
/// accept a part.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("sink closed")]
    Closed,
    #[error("sink rejected part: {0}")]
    Rejected(String),
}

impl DecodeError {
    /// Whether the error was raised by the decoder itself rather than by
    /// the byte stream or configuration.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, DecodeError::IncompleteToolCall { .. })
    }
}
