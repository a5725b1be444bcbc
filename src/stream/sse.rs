//! Event-stream line framing.
//!
//! Bytes from the response body arrive in arbitrary pieces: a chunk may end
//! in the middle of a line or even in the middle of a UTF-8 sequence. The
//! types here turn that into a sequence of complete lines, each delivered
//! exactly once.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use memchr::memchr_iter;
use pin_project_lite::pin_project;
use smallvec::SmallVec;

struct PendingLines {
    lines: SmallVec<[String; 8]>,
    head: usize,
}

impl PendingLines {
    #[inline]
    fn new() -> Self {
        Self {
            lines: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<String> {
        if self.head >= self.lines.len() {
            return None;
        }
        let line = std::mem::take(&mut self.lines[self.head]);
        self.head += 1;
        if self.head == self.lines.len() {
            self.lines.clear();
            self.head = 0;
        }
        Some(line)
    }

    #[inline]
    fn extend_from_vec(&mut self, parsed: &mut Vec<String>) {
        if parsed.is_empty() {
            return;
        }
        self.lines.reserve(parsed.len());
        self.lines.extend(parsed.drain(..));
    }
}

// ---------------------------------------------------------------------------
// LineFramer: incremental line splitter
// ---------------------------------------------------------------------------

/// Incremental line splitter.
///
/// Feed it text chunks and it returns every line completed so far; the
/// unterminated tail stays buffered until a later chunk finishes it.
/// A trailing `\r` is stripped so CRLF-framed streams decode the same way.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: String,
    read_offset: usize,
}

impl LineFramer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed text and return the complete lines it finishes.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed text and append complete lines into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<String>) {
        self.buffer.push_str(chunk);
        let mut processed_up_to = self.read_offset;
        let bytes = self.buffer.as_bytes();
        let scan_start = processed_up_to;
        for rel_pos in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let mut line = &self.buffer[processed_up_to..line_end];
            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
            out.push(line.to_owned());
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= 8 * 1024);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    /// Take the unterminated tail once the input has ended.
    pub fn finish(&mut self) -> Option<String> {
        let tail = &self.buffer[self.read_offset..];
        let tail = tail.strip_suffix('\r').unwrap_or(tail);
        let out = (!tail.is_empty()).then(|| tail.to_owned());
        self.clear();
        out
    }

    /// Bytes buffered waiting for a newline.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.read_offset
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_offset = 0;
    }
}

// ---------------------------------------------------------------------------
// Utf8ChunkDecoder: UTF-8 decoding across chunk boundaries
// ---------------------------------------------------------------------------

/// Decodes byte chunks as UTF-8, holding back a sequence split across two
/// chunks until its remaining bytes arrive. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    remainder: Vec<u8>,
}

impl Utf8ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len() + self.remainder.len());
        if self.remainder.is_empty() {
            self.decode_into(bytes, &mut out);
        } else {
            let mut joined = std::mem::take(&mut self.remainder);
            joined.extend_from_slice(bytes);
            self.decode_into(&joined, &mut out);
        }
        out
    }

    fn decode_into(&mut self, mut bytes: &[u8], out: &mut String) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&bytes[..valid_up_to]) {
                        out.push_str(valid);
                    }
                    match e.error_len() {
                        // Truncated sequence at the end of the chunk.
                        None => {
                            self.remainder.extend_from_slice(&bytes[valid_up_to..]);
                            return;
                        }
                        Some(invalid_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            bytes = &bytes[valid_up_to + invalid_len..];
                        }
                    }
                }
            }
        }
    }

    /// Flush a sequence left incomplete when the input ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.remainder.is_empty() {
            return None;
        }
        self.remainder.clear();
        Some(char::REPLACEMENT_CHARACTER.to_string())
    }
}

// ---------------------------------------------------------------------------
// Stream utility
// ---------------------------------------------------------------------------

pin_project! {
    /// Split a byte stream into lines using [`Utf8ChunkDecoder`] and
    /// [`LineFramer`].
    ///
    /// An error from the byte stream is passed through; the caller decides
    /// whether to keep polling. When the byte stream ends, a final line
    /// without a trailing newline is still yielded.
    pub struct LineStream<S> {
        #[pin]
        inner: S,
        decoder: Utf8ChunkDecoder,
        framer: LineFramer,
        parsed: Vec<String>,
        pending: PendingLines,
        finished: bool,
    }
}

impl<S> LineStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8ChunkDecoder::new(),
            framer: LineFramer::new(),
            parsed: Vec::with_capacity(8),
            pending: PendingLines::new(),
            finished: false,
        }
    }
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<String, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(line) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    let text = this.decoder.decode(&bytes);
                    this.framer.feed_into(&text, this.parsed);
                    this.pending.extend_from_vec(this.parsed);
                }
                Some(Err(err)) => return Poll::Ready(Some(Err(err))),
                None => {
                    *this.finished = true;
                    if let Some(tail) = this.decoder.finish() {
                        this.framer.feed_into(&tail, this.parsed);
                    }
                    if let Some(rest) = this.framer.finish() {
                        this.parsed.push(rest);
                    }
                    this.pending.extend_from_vec(this.parsed);
                }
            }
        }
    }
}

/// Split a byte stream into event-stream lines.
pub fn sse_line_stream<S, E>(byte_stream: S) -> LineStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    LineStream::new(byte_stream)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
