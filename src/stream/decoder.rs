use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::DecodeError;
use crate::observability::log_stream_summary;
use crate::protocol::canonical::StreamSummary;
use crate::stream::dispatch::DeltaDispatcher;
use crate::stream::sink::PartSink;
use crate::stream::sse::sse_line_stream;
use crate::stream::state::ResponseStreamState;

/// Decode an OpenAI-compatible chat completion byte stream into parts.
///
/// Lines are handled strictly in arrival order and every part is passed to
/// `sink` before the next line is read. When the byte stream ends, buffered
/// tool calls and any open inline call are settled as on `[DONE]`.
/// Cancellation stops reading immediately without settling anything.
///
/// # Errors
///
/// Returns [`DecodeError::IncompleteToolCall`] when the server finishes the
/// turn while a buffered tool call is unusable, and
/// [`DecodeError::Transport`] when the byte stream fails. Parts emitted
/// before the error stay emitted.
pub async fn process_response_stream<B, E, S>(
    config: &AppConfig,
    byte_stream: B,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<StreamSummary, DecodeError>
where
    B: Stream<Item = Result<Bytes, E>>,
    E: Display,
    S: PartSink + ?Sized,
{
    let dispatcher = DeltaDispatcher::new(config);
    let mut state = ResponseStreamState::new();

    let result = drive(&dispatcher, &mut state, byte_stream, sink, cancel).await;
    let result = result.map(|cancelled| state.summary(cancelled));
    match &result {
        Ok(summary) => log_stream_summary(summary),
        Err(err) => tracing::warn!(error = %err, "response stream failed"),
    }
    state.reset();
    result
}

/// Returns whether the stream was cancelled.
async fn drive<B, E, S>(
    dispatcher: &DeltaDispatcher,
    state: &mut ResponseStreamState,
    byte_stream: B,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<bool, DecodeError>
where
    B: Stream<Item = Result<Bytes, E>>,
    E: Display,
    S: PartSink + ?Sized,
{
    let mut lines = Box::pin(sse_line_stream(byte_stream));
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("response stream cancelled");
                return Ok(true);
            }
            next = lines.next() => next,
        };
        match next {
            Some(Ok(line)) => dispatcher.handle_line(state, &line, sink)?,
            Some(Err(err)) => return Err(DecodeError::Transport(err.to_string())),
            None => break,
        }
    }
    dispatcher.flush_pending(state, sink);
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::canonical::ResponsePart;
    use std::convert::Infallible;

    fn byte_stream(chunks: &[&str]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        let chunks: Vec<Result<Bytes, Infallible>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
            .collect();
        futures_util::stream::iter(chunks)
    }

    #[tokio::test]
    async fn end_of_stream_settles_buffers_like_done() {
        let mut sink: Vec<ResponsePart> = Vec::new();
        let summary = process_response_stream(
            &AppConfig::default(),
            byte_stream(&[
                "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c\",\"function\":{\"name\":\"f\",\"arguments\":\"\"}}]}}]}\n",
            ]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(sink.len(), 1);
        assert!(sink[0].is_tool_call());
        assert_eq!(summary.tool_calls, 1);
        assert!(!summary.saw_done);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_reading() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink: Vec<ResponsePart> = Vec::new();
        let summary = process_response_stream(
            &AppConfig::default(),
            byte_stream(&["data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n"]),
            &mut sink,
            &cancel,
        )
        .await
        .unwrap();
        assert!(sink.is_empty());
        assert!(summary.cancelled);
    }

    #[tokio::test]
    async fn transport_error_is_reported() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n")),
            Err("connection reset".to_string()),
        ];
        let mut sink: Vec<ResponsePart> = Vec::new();
        let err = process_response_stream(
            &AppConfig::default(),
            futures_util::stream::iter(chunks),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DecodeError::Transport(ref msg) if msg == "connection reset"));
        assert_eq!(sink, vec![ResponsePart::text("a")]);
    }
}
