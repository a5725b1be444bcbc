//! Routes each decoded stream event to the part it produces.
//!
//! Per delta the order is fixed: thinking, visible content (through the
//! inline tokenizer), standard tool-call fragments, then the finish reason.

use crate::config::{AppConfig, DecoderConfig};
use crate::error::DecodeError;
use crate::fc::buffer::ReadyToolCall;
use crate::fc::inline::{InlineCall, InlineEvent, InlineEvents, InlineTokenizer};
use crate::json_scan::canonical_json;
use crate::protocol::canonical::ResponsePart;
use crate::protocol::mapping::openai_finish_reason_to_canonical;
use crate::protocol::openai_chat::stream::{decode_sse_line, SseLine};
use crate::protocol::openai_chat::{OpenAiStreamChoice, OpenAiStreamChunk, ThinkingDelta};
use crate::stream::sink::PartSink;
use crate::stream::state::{ResponseStreamState, StreamStats};
use crate::util::next_call_id;

/// Text part sent once before the first standard tool call when visible
/// text preceded it, so consumers flush their text rendering.
const BEGIN_TOOL_CALLS_HINT: &str = " ";

#[derive(Debug)]
pub struct DeltaDispatcher {
    decoder: DecoderConfig,
    inline: InlineTokenizer,
}

impl Default for DeltaDispatcher {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl DeltaDispatcher {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            decoder: config.decoder.clone(),
            inline: InlineTokenizer::from_config(&config.inline_tool_calls),
        }
    }

    /// Decode and dispatch one line of the event stream.
    pub fn handle_line<S>(
        &self,
        state: &mut ResponseStreamState,
        line: &str,
        sink: &mut S,
    ) -> Result<(), DecodeError>
    where
        S: PartSink + ?Sized,
    {
        match decode_sse_line(line, self.decoder.allow_data_without_space) {
            SseLine::Ignored | SseLine::Malformed => Ok(()),
            SseLine::Done => {
                state.stats.saw_done = true;
                self.flush_pending(state, sink);
                Ok(())
            }
            SseLine::Chunk(chunk) => self.handle_chunk(state, chunk, sink),
        }
    }

    /// Dispatch a decoded chunk. Only the first choice is considered.
    pub fn handle_chunk<S>(
        &self,
        state: &mut ResponseStreamState,
        chunk: OpenAiStreamChunk,
        sink: &mut S,
    ) -> Result<(), DecodeError>
    where
        S: PartSink + ?Sized,
    {
        if chunk.choices.len() > 1 {
            tracing::debug!(
                choices = chunk.choices.len(),
                "ignoring all but the first choice"
            );
        }
        match chunk.choices.into_iter().next() {
            Some(choice) => self.handle_choice(state, choice, sink),
            None => Ok(()),
        }
    }

    fn handle_choice<S>(
        &self,
        state: &mut ResponseStreamState,
        choice: OpenAiStreamChoice,
        sink: &mut S,
    ) -> Result<(), DecodeError>
    where
        S: PartSink + ?Sized,
    {
        let OpenAiStreamChoice {
            mut delta,
            finish_reason,
            ..
        } = choice;

        match delta.take_thinking() {
            Some(ThinkingDelta::Text(text)) if !text.is_empty() => {
                emit_part(&mut state.stats, sink, ResponsePart::thinking(text));
            }
            Some(ThinkingDelta::Block(block)) if !block.text.is_empty() => {
                let part = ResponsePart::Thinking {
                    text: block.text,
                    id: block.id,
                    metadata: block.metadata,
                };
                emit_part(&mut state.stats, sink, part);
            }
            Some(ThinkingDelta::Unrecognized(value)) => {
                tracing::warn!(payload = %value, "ignoring unrecognized thinking payload");
            }
            Some(_) | None => {}
        }

        if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
            let mut events = InlineEvents::new();
            self.inline.feed(&mut state.inline, content, &mut events);
            handle_inline_events(state, events, sink);
        }

        if let Some(fragments) = delta.tool_calls.take().filter(|f| !f.is_empty()) {
            if self.decoder.emit_flush_hint
                && state.has_emitted_text
                && !state.emitted_begin_tool_calls_hint
            {
                emit_part(
                    &mut state.stats,
                    sink,
                    ResponsePart::text(BEGIN_TOOL_CALLS_HINT),
                );
                state.emitted_begin_tool_calls_hint = true;
            }
            for fragment in fragments {
                if let Some(ready) = state.tool_calls.push_fragment(fragment) {
                    emit_standard_call(state, sink, ready);
                }
            }
        }

        if let Some(reason) = finish_reason {
            let reason = openai_finish_reason_to_canonical(&reason);
            let completes_turn = reason.completes_turn();
            state.stats.finish_reason = Some(reason);
            if completes_turn {
                complete_turn(state, sink)?;
            }
        }
        Ok(())
    }

    /// Settle everything still buffered without raising. Runs on `[DONE]`
    /// and when the byte stream ends.
    pub fn flush_pending<S>(&self, state: &mut ResponseStreamState, sink: &mut S)
    where
        S: PartSink + ?Sized,
    {
        let outcome = state.tool_calls.flush();
        for ready in outcome.ready {
            emit_standard_call(state, sink, ready);
        }
        for dropped in outcome.unusable {
            tracing::debug!(
                index = dropped.index,
                name = dropped.name.as_deref().unwrap_or("<missing>"),
                args_len = dropped.args.len(),
                "dropping unusable tool call at end of stream"
            );
        }

        let mut events = InlineEvents::new();
        self.inline.finish(&mut state.inline, &mut events);
        handle_inline_events(state, events, sink);
    }
}

/// Flush standard buffers because the server declared the turn finished.
/// Usable calls are emitted first; the first unusable one is then reported.
fn complete_turn<S>(state: &mut ResponseStreamState, sink: &mut S) -> Result<(), DecodeError>
where
    S: PartSink + ?Sized,
{
    let outcome = state.tool_calls.flush();
    for ready in outcome.ready {
        emit_standard_call(state, sink, ready);
    }
    match outcome.unusable.into_iter().next() {
        Some(call) => Err(DecodeError::IncompleteToolCall {
            index: call.index,
            name: call.name,
            arguments: call.args,
        }),
        None => Ok(()),
    }
}

fn emit_standard_call<S>(state: &mut ResponseStreamState, sink: &mut S, ready: ReadyToolCall)
where
    S: PartSink + ?Sized,
{
    state
        .ledger
        .record_content(&ready.name, &canonical_json(&ready.arguments));
    let part = ResponsePart::ToolCall {
        id: ready.id.unwrap_or_else(next_call_id),
        name: ready.name,
        arguments: ready.arguments,
    };
    emit_part(&mut state.stats, sink, part);
}

fn handle_inline_events<S>(state: &mut ResponseStreamState, events: InlineEvents, sink: &mut S)
where
    S: PartSink + ?Sized,
{
    for event in events {
        match event {
            InlineEvent::Text(text) => {
                state.has_emitted_text = true;
                emit_part(&mut state.stats, sink, ResponsePart::text(text));
            }
            InlineEvent::Call(call) => emit_inline_call(state, sink, call),
        }
    }
}

fn emit_inline_call<S>(state: &mut ResponseStreamState, sink: &mut S, call: InlineCall)
where
    S: PartSink + ?Sized,
{
    let canonical = canonical_json(&call.arguments);
    if !state.ledger.claim(&call.name, call.index, &canonical) {
        tracing::debug!(
            name = %call.name,
            index = ?call.index,
            "suppressing duplicate inline tool call"
        );
        return;
    }
    let part = ResponsePart::ToolCall {
        id: next_call_id(),
        name: call.name,
        arguments: call.arguments,
    };
    emit_part(&mut state.stats, sink, part);
}

fn emit_part<S>(stats: &mut StreamStats, sink: &mut S, part: ResponsePart)
where
    S: PartSink + ?Sized,
{
    stats.record(&part);
    if let Err(err) = sink.emit(part) {
        stats.sink_failures += 1;
        tracing::warn!(error = %err, "sink rejected response part");
    }
}
