use std::io::{self, Write};
use std::time::Instant;

use chatstream::config::{load_config, AppConfig};
use chatstream::error::SinkError;
use chatstream::observability::{init_tracing, log_stream_duration};
use chatstream::protocol::canonical::ResponsePart;
use chatstream::stream::{process_response_stream, FnSink};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

const EXIT_DECODE_FAILED: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

/// `chatstream-decode [CONFIG]`
///
/// Reads an OpenAI-compatible chat completion event stream on stdin and
/// prints every decoded part to stdout as one JSON object per line.
fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).unwrap_or_else(|e| {
            eprintln!("Failed to load configuration from {path}: {e}");
            std::process::exit(1);
        }),
        None => AppConfig::default(),
    };

    init_tracing(&config.features.log_level);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    let code = runtime.block_on(run(config));
    std::process::exit(code);
}

async fn run(config: AppConfig) -> i32 {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            signal_token.cancel();
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut sink = FnSink(|part: ResponsePart| write_part(&mut out, &part));

    let started = Instant::now();
    let result = process_response_stream(
        &config,
        ReaderStream::new(tokio::io::stdin()),
        &mut sink,
        &cancel,
    )
    .await;
    log_stream_duration(started.elapsed());
    drop(sink);
    let _ = out.flush();

    match result {
        Ok(summary) if summary.cancelled => EXIT_INTERRUPTED,
        Ok(_) => 0,
        Err(e) => {
            eprintln!("Failed to decode response stream: {e}");
            EXIT_DECODE_FAILED
        }
    }
}

fn write_part(out: &mut impl Write, part: &ResponsePart) -> Result<(), SinkError> {
    let line = serde_json::to_string(part).map_err(|e| SinkError::Rejected(e.to_string()))?;
    writeln!(out, "{line}").map_err(|e| match e.kind() {
        io::ErrorKind::BrokenPipe => SinkError::Closed,
        _ => SinkError::Rejected(e.to_string()),
    })
}
