//! Reassembly of OpenAI-style tool calls streamed as indexed fragments.
//!
//! Each fragment names a slot (`index`) and may carry the call id, the
//! function name and a piece of the arguments string. A slot becomes ready
//! as soon as it has a name and its accumulated arguments parse as a JSON
//! object, which is often well before the server reports the end of the
//! turn.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::json_scan::{try_parse_object, JsonReadiness};
use crate::protocol::canonical::JsonObject;
use crate::protocol::openai_chat::OpenAiStreamToolCall;

/// Partially received tool call for one index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingToolCall {
    pub id: Option<String>,
    pub name: Option<String>,
    pub args: String,
}

/// A tool call whose arguments are complete.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyToolCall {
    pub index: u32,
    pub id: Option<String>,
    pub name: String,
    pub arguments: JsonObject,
}

/// A buffered call that could not be completed at flush time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusableToolCall {
    pub index: u32,
    pub name: Option<String>,
    pub args: String,
}

/// Result of draining every remaining slot.
#[derive(Debug, Default)]
pub struct FlushOutcome {
    /// Ready calls in ascending index order.
    pub ready: SmallVec<[ReadyToolCall; 2]>,
    /// Calls with no name or unparseable arguments, in ascending index order.
    pub unusable: SmallVec<[UnusableToolCall; 1]>,
}

/// Per-stream tool-call slots.
#[derive(Debug, Default)]
pub struct ToolCallBuffers {
    buffers: FxHashMap<u32, PendingToolCall>,
    completed: FxHashSet<u32>,
}

impl ToolCallBuffers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one fragment and return the call if it just became ready.
    ///
    /// Fragments for an index that was already emitted are ignored.
    pub fn push_fragment(&mut self, fragment: OpenAiStreamToolCall) -> Option<ReadyToolCall> {
        let index = fragment.index;
        if self.completed.contains(&index) {
            tracing::debug!(index, "ignoring fragment for completed tool call");
            return None;
        }

        let entry = self.buffers.entry(index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            entry.id = Some(id);
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                entry.name = Some(name);
            }
            if let Some(arguments) = function.arguments {
                entry.args.push_str(&arguments);
            }
        }

        self.try_complete(index)
    }

    fn try_complete(&mut self, index: u32) -> Option<ReadyToolCall> {
        let entry = self.buffers.get(&index)?;
        if entry.name.as_deref().map_or(true, str::is_empty) {
            return None;
        }
        let JsonReadiness::Ready(arguments) = try_parse_object(&entry.args) else {
            return None;
        };
        let entry = self.buffers.remove(&index)?;
        self.completed.insert(index);
        Some(ReadyToolCall {
            index,
            id: entry.id,
            name: entry.name.unwrap_or_default(),
            arguments,
        })
    }

    /// Drain every remaining slot.
    ///
    /// A named slot with empty arguments completes as `{}`. Whether unusable
    /// slots are an error is up to the caller.
    pub fn flush(&mut self) -> FlushOutcome {
        let mut indices: SmallVec<[u32; 4]> = self.buffers.keys().copied().collect();
        indices.sort_unstable();

        let mut outcome = FlushOutcome::default();
        for index in indices {
            let Some(entry) = self.buffers.remove(&index) else {
                continue;
            };
            let arguments = if entry.args.trim().is_empty() {
                Some(JsonObject::new())
            } else {
                try_parse_object(&entry.args).into_object()
            };
            match (entry.name, arguments) {
                (Some(name), Some(arguments)) if !name.is_empty() => {
                    self.completed.insert(index);
                    outcome.ready.push(ReadyToolCall {
                        index,
                        id: entry.id,
                        name,
                        arguments,
                    });
                }
                (name, _) => outcome.unusable.push(UnusableToolCall {
                    index,
                    name,
                    args: entry.args,
                }),
            }
        }
        outcome
    }

    #[must_use]
    pub fn pending(&self, index: u32) -> Option<&PendingToolCall> {
        self.buffers.get(&index)
    }

    #[must_use]
    pub fn is_completed(&self, index: u32) -> bool {
        self.completed.contains(&index)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffers.len()
    }

    /// No pending slots and no completed indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.completed.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
        self.completed.clear();
    }
}
