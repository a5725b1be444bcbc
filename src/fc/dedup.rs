use rustc_hash::FxHashSet;

/// Remembers which tool calls were already emitted in the current stream.
///
/// Two independent keys are tracked:
/// - identity `name:index`, for calls that carry a positional index; the
///   first emission for a slot wins even if a later attempt has different
///   arguments.
/// - content `name:canonical-json`, for calls without an index; suppresses
///   exact repeats.
#[derive(Debug, Default)]
pub struct DedupLedger {
    emitted_call_keys: FxHashSet<String>,
    emitted_call_ids: FxHashSet<String>,
}

impl DedupLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to emit a call. Returns `false` when an equivalent
    /// call was already emitted, in which case nothing is recorded.
    pub fn claim(&mut self, name: &str, index: Option<u32>, canonical_args: &str) -> bool {
        match index {
            Some(index) => self.emitted_call_ids.insert(identity_key(name, index)),
            None => self.emitted_call_keys.insert(content_key(name, canonical_args)),
        }
    }

    /// Record a content key without consulting it.
    pub fn record_content(&mut self, name: &str, canonical_args: &str) {
        self.emitted_call_keys
            .insert(content_key(name, canonical_args));
    }

    #[must_use]
    pub fn contains_identity(&self, name: &str, index: u32) -> bool {
        self.emitted_call_ids.contains(&identity_key(name, index))
    }

    #[must_use]
    pub fn contains_content(&self, name: &str, canonical_args: &str) -> bool {
        self.emitted_call_keys
            .contains(&content_key(name, canonical_args))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emitted_call_keys.is_empty() && self.emitted_call_ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.emitted_call_keys.clear();
        self.emitted_call_ids.clear();
    }
}

fn identity_key(name: &str, index: u32) -> String {
    format!("{name}:{index}")
}

fn content_key(name: &str, canonical_args: &str) -> String {
    let mut key = String::with_capacity(name.len() + 1 + canonical_args.len());
    key.push_str(name);
    key.push(':');
    key.push_str(canonical_args);
    key
}
