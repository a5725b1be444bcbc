//! Readiness probe for JSON object text that grows one fragment at a time.
//!
//! Tool-call arguments stream in as string fragments. After every fragment
//! the decoder asks whether the text seen so far is already a complete JSON
//! object. Most of the time the answer is "not yet", so a byte-level
//! structural scan runs first and `serde_json` only materializes text that
//! is known to be a closed object.

use serde_json::{Map, Value};

/// Nesting limit for the structural scan, matching `serde_json`'s default.
const MAX_DEPTH: usize = 128;

/// Outcome of [`try_parse_object`].
#[derive(Debug, Clone, PartialEq)]
pub enum JsonReadiness {
    /// The text is a complete JSON object.
    Ready(Map<String, Value>),
    /// The text is incomplete, malformed, or not an object.
    NotReady,
}

impl JsonReadiness {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, JsonReadiness::Ready(_))
    }

    #[must_use]
    pub fn into_object(self) -> Option<Map<String, Value>> {
        match self {
            JsonReadiness::Ready(map) => Some(map),
            JsonReadiness::NotReady => None,
        }
    }
}

/// Check whether `text` currently parses as a JSON object.
///
/// Arrays, strings, numbers and literals are rejected even when they are
/// syntactically complete. Surrounding whitespace is allowed. Never panics.
#[must_use]
pub fn try_parse_object(text: &str) -> JsonReadiness {
    if !is_complete_object(text.as_bytes()) {
        return JsonReadiness::NotReady;
    }
    match serde_json::from_str::<Map<String, Value>>(text) {
        Ok(map) => JsonReadiness::Ready(map),
        Err(_) => JsonReadiness::NotReady,
    }
}

/// Structural check: one object, optionally surrounded by whitespace.
#[must_use]
pub fn is_complete_object(bytes: &[u8]) -> bool {
    let start = skip_ws(bytes, 0);
    if bytes.get(start) != Some(&b'{') {
        return false;
    }
    match parse_json_object_end(bytes, start, 0) {
        Ok(end) => skip_ws(bytes, end) == bytes.len(),
        Err(()) => false,
    }
}

#[inline]
fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    let len = bytes.len();
    while i < len {
        match bytes[i] {
            b' ' | b'\n' | b'\r' | b'\t' => i += 1,
            _ => break,
        }
    }
    i
}

#[inline]
fn parse_json_string_end(bytes: &[u8], start: usize) -> Result<usize, ()> {
    let len = bytes.len();
    if start >= len || bytes[start] != b'"' {
        return Err(());
    }
    let mut i = start + 1;
    while i < len {
        match bytes[i] {
            b'"' => return Ok(i + 1),
            b'\\' => {
                i += 1;
                if i >= len {
                    return Err(());
                }
                i += 1;
            }
            0x00..=0x1F => return Err(()),
            _ => i += 1,
        }
    }
    Err(())
}

#[inline]
fn parse_json_value_end(bytes: &[u8], start: usize, depth: usize) -> Result<usize, ()> {
    let i = skip_ws(bytes, start);
    if i >= bytes.len() {
        return Err(());
    }

    match bytes[i] {
        b'"' => parse_json_string_end(bytes, i),
        b'{' => parse_json_object_end(bytes, i, depth + 1),
        b'[' => parse_json_array_end(bytes, i, depth + 1),
        b't' => consume_literal(bytes, i, b"true"),
        b'f' => consume_literal(bytes, i, b"false"),
        b'n' => consume_literal(bytes, i, b"null"),
        b'-' | b'0'..=b'9' => parse_json_number_end(bytes, i),
        _ => Err(()),
    }
}

fn parse_json_object_end(bytes: &[u8], start: usize, depth: usize) -> Result<usize, ()> {
    let len = bytes.len();
    if depth > MAX_DEPTH || start >= len || bytes[start] != b'{' {
        return Err(());
    }
    let mut i = start + 1;
    loop {
        i = skip_ws(bytes, i);
        if i >= len {
            return Err(());
        }
        match bytes[i] {
            b'}' => return Ok(i + 1),
            b'"' => {}
            _ => return Err(()),
        }

        i = parse_json_string_end(bytes, i)?;
        i = skip_ws(bytes, i);
        if i >= len || bytes[i] != b':' {
            return Err(());
        }
        i = parse_json_value_end(bytes, i + 1, depth)?;
        i = skip_ws(bytes, i);
        if i >= len {
            return Err(());
        }
        match bytes[i] {
            b',' => i += 1,
            b'}' => return Ok(i + 1),
            _ => return Err(()),
        }
    }
}

fn parse_json_array_end(bytes: &[u8], start: usize, depth: usize) -> Result<usize, ()> {
    let len = bytes.len();
    if depth > MAX_DEPTH || start >= len || bytes[start] != b'[' {
        return Err(());
    }
    let mut i = start + 1;
    loop {
        i = skip_ws(bytes, i);
        if i >= len {
            return Err(());
        }
        if bytes[i] == b']' {
            return Ok(i + 1);
        }

        i = parse_json_value_end(bytes, i, depth)?;
        i = skip_ws(bytes, i);
        if i >= len {
            return Err(());
        }
        match bytes[i] {
            b',' => i += 1,
            b']' => return Ok(i + 1),
            _ => return Err(()),
        }
    }
}

#[inline]
fn consume_literal(bytes: &[u8], start: usize, lit: &[u8]) -> Result<usize, ()> {
    let end = start.checked_add(lit.len()).ok_or(())?;
    if end <= bytes.len() && &bytes[start..end] == lit {
        Ok(end)
    } else {
        Err(())
    }
}

#[inline]
fn parse_json_number_end(bytes: &[u8], start: usize) -> Result<usize, ()> {
    let len = bytes.len();
    let mut i = start;
    if i < len && bytes[i] == b'-' {
        i += 1;
    }

    if i >= len {
        return Err(());
    }
    match bytes[i] {
        b'0' => i += 1,
        b'1'..=b'9' => {
            i += 1;
            while i < len && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        _ => return Err(()),
    }

    if i < len && bytes[i] == b'.' {
        i += 1;
        if i >= len || !bytes[i].is_ascii_digit() {
            return Err(());
        }
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i < len && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < len && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        if i >= len || !bytes[i].is_ascii_digit() {
            return Err(());
        }
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    Ok(i)
}

/// Deterministic text form of an argument object, used as a dedup key.
///
/// `serde_json::Map` keeps keys sorted, so equal objects always serialize
/// identically.
#[must_use]
pub fn canonical_json(map: &Map<String, Value>) -> String {
    // Serializing an in-memory map into a `String` cannot fail.
    serde_json::to_string(map).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complete_object_is_ready() {
        let readiness = try_parse_object(r#"{"q":"x","n":1}"#);
        let map = readiness.into_object().expect("ready");
        assert_eq!(map.get("q"), Some(&json!("x")));
        assert_eq!(map.get("n"), Some(&json!(1)));
    }

    #[test]
    fn surrounding_whitespace_is_allowed() {
        assert!(try_parse_object("  \n{}\t ").is_ready());
    }

    #[test]
    fn growing_prefixes_are_not_ready_until_closed() {
        let full = r#"{"location":"Tokyo","units":["c","f"],"deep":{"a":null}}"#;
        for end in 0..full.len() {
            assert!(
                !try_parse_object(&full[..end]).is_ready(),
                "prefix {:?} reported ready",
                &full[..end]
            );
        }
        assert!(try_parse_object(full).is_ready());
    }

    #[test]
    fn non_object_top_level_values_are_rejected() {
        for text in ["[]", "[1,2]", "1", "-0.5e3", "\"s\"", "true", "null", ""] {
            assert_eq!(try_parse_object(text), JsonReadiness::NotReady, "{text}");
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(!try_parse_object("{} x").is_ready());
        assert!(!try_parse_object("{}{}").is_ready());
        assert!(!try_parse_object("{invalid").is_ready());
    }

    #[test]
    fn invalid_escape_passes_scan_but_fails_parse() {
        let text = r#"{"a":"\q"}"#;
        assert!(is_complete_object(text.as_bytes()));
        assert!(!try_parse_object(text).is_ready());
    }

    #[test]
    fn excessive_nesting_is_not_ready() {
        let mut text = String::from("{\"a\":");
        text.push_str(&"[".repeat(MAX_DEPTH + 4));
        text.push_str(&"]".repeat(MAX_DEPTH + 4));
        text.push('}');
        assert!(!try_parse_object(&text).is_ready());
    }

    #[test]
    fn canonical_json_is_key_order_independent() {
        let a = try_parse_object(r#"{"b":1,"a":{"y":2,"x":[1,"s"]}}"#)
            .into_object()
            .unwrap();
        let b = try_parse_object(r#"{ "a": {"x": [1, "s"], "y": 2}, "b": 1 }"#)
            .into_object()
            .unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"a":{"x":[1,"s"],"y":2},"b":1}"#);
    }

    #[test]
    fn canonical_json_of_empty_object() {
        assert_eq!(canonical_json(&Map::new()), "{}");
    }
}
