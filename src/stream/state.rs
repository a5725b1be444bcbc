use crate::fc::buffer::ToolCallBuffers;
use crate::fc::dedup::DedupLedger;
use crate::fc::inline::InlineState;
use crate::protocol::canonical::{FinishReason, ResponsePart, StreamSummary};

/// Counters reported in [`StreamSummary`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamStats {
    pub text_parts: usize,
    pub thinking_parts: usize,
    pub tool_calls: usize,
    pub sink_failures: usize,
    pub finish_reason: Option<FinishReason>,
    pub saw_done: bool,
}

impl StreamStats {
    pub(crate) fn record(&mut self, part: &ResponsePart) {
        match part {
            ResponsePart::Text { .. } => self.text_parts += 1,
            ResponsePart::Thinking { .. } => self.thinking_parts += 1,
            ResponsePart::ToolCall { .. } => self.tool_calls += 1,
        }
    }
}

/// Mutable state of one response stream.
///
/// Owned by the call that drives the stream and cleared when the stream
/// ends, whether it completed, failed or was cancelled.
#[derive(Debug, Default)]
pub struct ResponseStreamState {
    pub tool_calls: ToolCallBuffers,
    pub has_emitted_text: bool,
    pub emitted_begin_tool_calls_hint: bool,
    pub inline: InlineState,
    pub ledger: DedupLedger,
    pub stats: StreamStats,
}

impl ResponseStreamState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self, cancelled: bool) -> StreamSummary {
        StreamSummary {
            text_parts: self.stats.text_parts,
            thinking_parts: self.stats.thinking_parts,
            tool_calls: self.stats.tool_calls,
            sink_failures: self.stats.sink_failures,
            finish_reason: self.stats.finish_reason.clone(),
            saw_done: self.stats.saw_done,
            cancelled,
        }
    }

    pub fn reset(&mut self) {
        self.tool_calls.clear();
        self.has_emitted_text = false;
        self.emitted_begin_tool_calls_hint = false;
        self.inline.clear();
        self.ledger.clear();
        self.stats = StreamStats::default();
    }

    /// True when nothing is buffered and nothing has been recorded.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.tool_calls.is_empty()
            && !self.has_emitted_text
            && !self.emitted_begin_tool_calls_hint
            && self.inline.is_idle()
            && self.ledger.is_empty()
            && self.stats == StreamStats::default()
    }
}
