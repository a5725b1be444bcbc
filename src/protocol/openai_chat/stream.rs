use super::OpenAiStreamChunk;

const DATA_PREFIX: &str = "data: ";
const DATA_PREFIX_NO_SPACE: &str = "data:";
const DONE_PAYLOAD: &str = "[DONE]";

/// Classification of a single event-stream line.
#[derive(Debug, Clone)]
pub enum SseLine {
    /// Not a data line (blank, comment, `event:`, `id:` ...).
    Ignored,
    /// The `[DONE]` terminator.
    Done,
    /// A data line whose payload is not a chunk object.
    Malformed,
    Chunk(OpenAiStreamChunk),
}

/// Extract the payload of a `data:` line.
///
/// Only `data: ` is recognized unless `allow_data_without_space` is set, in
/// which case `data:` directly followed by the payload is accepted too.
#[inline]
#[must_use]
pub fn extract_data_payload(line: &str, allow_data_without_space: bool) -> Option<&str> {
    let payload = if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
        rest
    } else if allow_data_without_space {
        line.strip_prefix(DATA_PREFIX_NO_SPACE)?
    } else {
        return None;
    };
    Some(payload.trim())
}

/// Decode one line of an OpenAI-compatible chat completion stream.
#[must_use]
pub fn decode_sse_line(line: &str, allow_data_without_space: bool) -> SseLine {
    let Some(payload) = extract_data_payload(line, allow_data_without_space) else {
        return SseLine::Ignored;
    };
    if payload == DONE_PAYLOAD {
        return SseLine::Done;
    }
    match serde_json::from_str::<OpenAiStreamChunk>(payload) {
        Ok(chunk) => SseLine::Chunk(chunk),
        Err(err) => {
            tracing::debug!(error = %err, payload_len = payload.len(), "skipping malformed stream event");
            SseLine::Malformed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_line() {
        let line = r#"data: {"id":"chatcmpl-1","object":"chat.completion.chunk","created":1700000000,"model":"gpt-4","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        let SseLine::Chunk(chunk) = decode_sse_line(line, false) else {
            panic!("expected chunk");
        };
        assert_eq!(chunk.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_decode_done() {
        assert!(matches!(decode_sse_line("data: [DONE]", false), SseLine::Done));
        assert!(matches!(decode_sse_line("data: [DONE]  ", false), SseLine::Done));
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        for line in ["", ": keep-alive", "event: message", "id: 7", "retry: 10", "{\"choices\":[]}"] {
            assert!(matches!(decode_sse_line(line, false), SseLine::Ignored), "{line}");
        }
    }

    #[test]
    fn test_data_without_space_requires_opt_in() {
        let line = r#"data:{"choices":[]}"#;
        assert!(matches!(decode_sse_line(line, false), SseLine::Ignored));
        assert!(matches!(decode_sse_line(line, true), SseLine::Chunk(_)));
        assert!(matches!(decode_sse_line("data:[DONE]", true), SseLine::Done));
    }

    #[test]
    fn test_malformed_payload_is_reported_not_raised() {
        assert!(matches!(
            decode_sse_line(r#"data: {"choices":[{"delta":"#, false),
            SseLine::Malformed
        ));
        assert!(matches!(decode_sse_line("data: [1,2]", false), SseLine::Malformed));
        assert!(matches!(decode_sse_line("data: ", false), SseLine::Malformed));
    }
}
