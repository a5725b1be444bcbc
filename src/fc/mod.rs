//! Tool-call reconstruction: the standard indexed-fragment channel, calls
//! embedded in text through control tokens, and the duplicate guard shared
//! by both.

pub mod buffer;
pub mod dedup;
pub mod inline;

pub use buffer::{ReadyToolCall, ToolCallBuffers};
pub use dedup::DedupLedger;
pub use inline::{InlineCall, InlineEvent, InlineState, InlineTokenizer};
