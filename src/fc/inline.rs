//! Tool calls embedded in text content through control tokens.
//!
//! Some servers (Kimi-K2 style) do not use the structured `tool_calls`
//! channel and instead stream
//! `<|tool_call_begin|>functions.name:0<|tool_call_argument_begin|>{...}<|tool_call_end|>`
//! inside `content`. [`InlineTokenizer`] splits such content into visible text
//! and completed calls across arbitrary fragment boundaries. It never writes
//! to a sink; callers receive [`InlineEvent`]s in order.

use std::borrow::Cow;
use std::sync::LazyLock;

use memchr::memmem::Finder;
use regex_lite::Regex;
use smallvec::SmallVec;

use crate::config::InlineToolCallConfig;
use crate::json_scan::try_parse_object;
use crate::protocol::canonical::JsonObject;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z0-9_.\-]+)(?::(?P<index>\d+))?")
        .unwrap_or_else(|err| panic!("invalid inline header pattern: {err}"))
});

/// A completed inline call.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineCall {
    pub name: String,
    pub index: Option<u32>,
    pub arguments: JsonObject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineEvent {
    Text(String),
    Call(InlineCall),
}

pub type InlineEvents = SmallVec<[InlineEvent; 4]>;

/// The call currently being assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveInlineCall {
    pub name: Option<String>,
    pub index: Option<u32>,
    pub arg_buffer: String,
    pub emitted: bool,
}

/// Per-stream tokenizer state.
#[derive(Debug, Default)]
pub struct InlineState {
    carry: String,
    active: Option<ActiveInlineCall>,
}

impl InlineState {
    #[must_use]
    pub fn carry(&self) -> &str {
        &self.carry
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveInlineCall> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.carry.is_empty() && self.active.is_none()
    }

    pub fn clear(&mut self) {
        self.carry.clear();
        self.active = None;
    }
}

/// Which marker closes a call header.
enum HeaderEnd {
    Arguments(usize),
    CallEnd(usize),
}

struct Marker {
    text: String,
    finder: Finder<'static>,
}

impl Marker {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            finder: Finder::new(text.as_bytes()).into_owned(),
        }
    }

    #[inline]
    fn find(&self, haystack: &str) -> Option<usize> {
        self.finder.find(haystack.as_bytes())
    }

    #[inline]
    fn len(&self) -> usize {
        self.text.len()
    }

    /// Length of the longest suffix of `data` that is a proper prefix of
    /// this marker.
    fn partial_suffix_len(&self, data: &str) -> usize {
        let max = self.text.len().saturating_sub(1).min(data.len());
        (1..=max)
            .rev()
            .find(|&k| self.text.is_char_boundary(k) && data.ends_with(&self.text[..k]))
            .unwrap_or(0)
    }
}

/// Splits content fragments into visible text and inline tool calls.
pub struct InlineTokenizer {
    enabled: bool,
    call_begin: Marker,
    argument_begin: Marker,
    call_end: Marker,
    /// Markers removed from visible text: the configured stray markers plus
    /// the argument-begin and call-end markers, which are meaningless
    /// outside a call.
    stray: Vec<Marker>,
    namespace_prefix: String,
}

impl Default for InlineTokenizer {
    fn default() -> Self {
        Self::from_config(&InlineToolCallConfig::default())
    }
}

impl std::fmt::Debug for InlineTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineTokenizer")
            .field("enabled", &self.enabled)
            .field("call_begin", &self.call_begin.text)
            .field("argument_begin", &self.argument_begin.text)
            .field("call_end", &self.call_end.text)
            .field("namespace_prefix", &self.namespace_prefix)
            .finish_non_exhaustive()
    }
}

impl InlineTokenizer {
    #[must_use]
    pub fn from_config(config: &InlineToolCallConfig) -> Self {
        let mut stray: Vec<Marker> = config
            .stray_markers
            .iter()
            .filter(|marker| !marker.is_empty())
            .map(|marker| Marker::new(marker))
            .collect();
        stray.push(Marker::new(&config.argument_begin));
        stray.push(Marker::new(&config.call_end));
        Self {
            enabled: config.enabled,
            call_begin: Marker::new(&config.call_begin),
            argument_begin: Marker::new(&config.argument_begin),
            call_end: Marker::new(&config.call_end),
            stray,
            namespace_prefix: config.namespace_prefix.clone(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Process one content fragment.
    pub fn feed(&self, state: &mut InlineState, fragment: &str, out: &mut InlineEvents) {
        if !self.enabled {
            if !fragment.is_empty() {
                out.push(InlineEvent::Text(fragment.to_string()));
            }
            return;
        }

        let mut data = std::mem::take(&mut state.carry);
        data.push_str(fragment);
        let mut pos = 0;

        while pos < data.len() {
            let rest = &data[pos..];
            let Some(active) = state.active.as_mut() else {
                let Some(at) = self.call_begin.find(rest) else {
                    let hold = self.outside_partial_len(rest);
                    let split = rest.len() - hold;
                    self.push_visible(&rest[..split], out);
                    state.carry.push_str(&rest[split..]);
                    break;
                };
                self.push_visible(&rest[..at], out);

                let header_start = at + self.call_begin.len();
                let tail = &rest[header_start..];
                let header_end = match (
                    self.argument_begin.find(tail),
                    self.call_end.find(tail),
                ) {
                    (None, None) => {
                        state.carry.push_str(&rest[at..]);
                        break;
                    }
                    (Some(i), Some(j)) if j < i => HeaderEnd::CallEnd(j),
                    (Some(i), _) => HeaderEnd::Arguments(i),
                    (None, Some(j)) => HeaderEnd::CallEnd(j),
                };
                match header_end {
                    HeaderEnd::Arguments(i) => {
                        let (name, index) = self.parse_header(&tail[..i]);
                        state.active = Some(ActiveInlineCall {
                            name,
                            index,
                            ..ActiveInlineCall::default()
                        });
                        pos += header_start + i + self.argument_begin.len();
                    }
                    HeaderEnd::CallEnd(j) => {
                        let (name, index) = self.parse_header(&tail[..j]);
                        match name {
                            Some(name) => out.push(InlineEvent::Call(InlineCall {
                                name,
                                index,
                                arguments: JsonObject::new(),
                            })),
                            None => tracing::debug!("dropping unnamed inline tool call"),
                        }
                        pos += header_start + j + self.call_end.len();
                    }
                }
                continue;
            };

            match self.call_end.find(rest) {
                None => {
                    let hold = self.call_end.partial_suffix_len(rest);
                    let split = rest.len() - hold;
                    active.arg_buffer.push_str(&rest[..split]);
                    if !active.emitted {
                        if let Some(call) = ready_call(active, false) {
                            active.emitted = true;
                            out.push(InlineEvent::Call(call));
                        }
                    }
                    state.carry.push_str(&rest[split..]);
                    break;
                }
                Some(j) => {
                    active.arg_buffer.push_str(&rest[..j]);
                    pos += j + self.call_end.len();
                    if let Some(active) = state.active.take() {
                        if !active.emitted {
                            match ready_call(&active, true) {
                                Some(call) => out.push(InlineEvent::Call(call)),
                                None => tracing::debug!(
                                    name = active.name.as_deref().unwrap_or("<missing>"),
                                    args_len = active.arg_buffer.len(),
                                    "dropping inline tool call with unusable arguments"
                                ),
                            }
                        }
                    }
                }
            }
        }
    }

    /// Settle whatever is left when the turn or the stream ends.
    ///
    /// An open call with valid, unemitted arguments is emitted. A carry that
    /// is only a partial marker is released as text; a carry holding an
    /// unfinished call header is discarded.
    pub fn finish(&self, state: &mut InlineState, out: &mut InlineEvents) {
        if let Some(active) = state.active.take() {
            if !active.emitted {
                match ready_call(&active, false) {
                    Some(call) => out.push(InlineEvent::Call(call)),
                    None => tracing::debug!(
                        name = active.name.as_deref().unwrap_or("<missing>"),
                        args_len = active.arg_buffer.len(),
                        "dropping unfinished inline tool call"
                    ),
                }
            }
        } else if !state.carry.is_empty() {
            if state.carry.starts_with(&self.call_begin.text) {
                tracing::debug!(
                    carry_len = state.carry.len(),
                    "dropping unfinished inline tool call header"
                );
            } else {
                let carry = std::mem::take(&mut state.carry);
                self.push_visible(&carry, out);
            }
        }
        state.clear();
    }

    fn outside_partial_len(&self, data: &str) -> usize {
        self.stray
            .iter()
            .map(|marker| marker.partial_suffix_len(data))
            .fold(self.call_begin.partial_suffix_len(data), usize::max)
    }

    fn push_visible(&self, text: &str, out: &mut InlineEvents) {
        if text.is_empty() {
            return;
        }
        let text = self.strip_stray(text);
        if text.is_empty() {
            return;
        }
        if let Some(InlineEvent::Text(last)) = out.last_mut() {
            last.push_str(&text);
        } else {
            out.push(InlineEvent::Text(text.into_owned()));
        }
    }

    fn strip_stray<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(text);
        for marker in &self.stray {
            if marker.find(&result).is_some() {
                result = Cow::Owned(result.replace(marker.text.as_str(), ""));
            }
        }
        result
    }

    fn parse_header(&self, raw: &str) -> (Option<String>, Option<u32>) {
        let trimmed = raw.trim();
        let header = if self.namespace_prefix.is_empty() {
            trimmed
        } else {
            trimmed
                .strip_prefix(self.namespace_prefix.as_str())
                .unwrap_or(trimmed)
        };
        let Some(caps) = HEADER_RE.captures(header) else {
            return (None, None);
        };
        let name = caps.name("name").map(|m| m.as_str().to_string());
        let index = caps.name("index").and_then(|m| m.as_str().parse().ok());
        (name, index)
    }
}

/// The call if it is named and its arguments form a JSON object.
/// With `closed`, blank arguments count as `{}`.
fn ready_call(active: &ActiveInlineCall, closed: bool) -> Option<InlineCall> {
    let name = active.name.as_deref().filter(|name| !name.is_empty())?;
    let arguments = if closed && active.arg_buffer.trim().is_empty() {
        JsonObject::new()
    } else {
        try_parse_object(&active.arg_buffer).into_object()?
    };
    Some(InlineCall {
        name: name.to_string(),
        index: active.index,
        arguments,
    })
}
