pub mod decoder;
pub mod dispatch;
pub mod sink;
pub mod sse;
pub mod state;

pub use decoder::process_response_stream;
pub use dispatch::DeltaDispatcher;
pub use sink::{FnSink, PartSink};
pub use sse::{sse_line_stream, LineFramer, LineStream, Utf8ChunkDecoder};
pub use state::ResponseStreamState;
