pub mod config;
pub mod error;
pub mod fc;
pub mod json_scan;
pub mod observability;
pub mod protocol;
pub mod stream;

mod util;

pub use config::AppConfig;
pub use error::{DecodeError, SinkError};
pub use protocol::canonical::{FinishReason, ResponsePart, StreamSummary};
pub use stream::{process_response_stream, PartSink};
