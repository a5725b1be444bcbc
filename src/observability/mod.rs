use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::protocol::canonical::StreamSummary;
use crate::protocol::mapping::canonical_finish_reason_to_openai;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
///
/// Logs go to stderr; stdout carries decoded parts.
pub fn init_tracing(log_level: &str) {
    let Some(directive) = tracing_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn tracing_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Log what a finished response stream produced at INFO level.
pub fn log_stream_summary(summary: &StreamSummary) {
    info!(
        text_parts = summary.text_parts,
        thinking_parts = summary.thinking_parts,
        tool_calls = summary.tool_calls,
        sink_failures = summary.sink_failures,
        finish_reason = summary
            .finish_reason
            .as_ref()
            .map_or("none", canonical_finish_reason_to_openai),
        saw_done = summary.saw_done,
        cancelled = summary.cancelled,
        "response stream completed"
    );
}

/// Log the wall-clock time spent decoding one response.
pub fn log_stream_duration(duration: Duration) {
    info!(
        duration_seconds = duration.as_secs_f64(),
        "response stream closed"
    );
}
