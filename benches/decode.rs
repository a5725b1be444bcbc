use std::convert::Infallible;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use chatstream::config::AppConfig;
use chatstream::fc::inline::{InlineEvents, InlineState, InlineTokenizer};
use chatstream::json_scan::try_parse_object;
use chatstream::protocol::canonical::ResponsePart;
use chatstream::stream::{process_response_stream, LineFramer};

fn content_event(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": content}}]})
    )
}

fn tool_fragment_event(index: u32, name: Option<&str>, arguments: &str) -> String {
    let mut function = json!({"arguments": arguments});
    if let Some(name) = name {
        function["name"] = json!(name);
    }
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": index, "function": function}]}}]})
    )
}

fn sample_body() -> String {
    let mut body = String::new();
    for i in 0..200 {
        body.push_str(&content_event(&format!("token {i} ")));
    }
    body.push_str(&tool_fragment_event(0, Some("search"), ""));
    for i in 0..50 {
        let piece = if i == 0 {
            "{\"query\":\"".to_string()
        } else {
            format!("part{i} ")
        };
        body.push_str(&tool_fragment_event(0, None, &piece));
    }
    body.push_str(&tool_fragment_event(0, None, "\"}"));
    body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

/// Split `text` into pieces of roughly `size` bytes on char boundaries.
fn split_fragments(text: &str, size: usize) -> Vec<&str> {
    let mut pieces = Vec::with_capacity(text.len() / size + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = rest.len().min(size);
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (piece, tail) = rest.split_at(end);
        pieces.push(piece);
        rest = tail;
    }
    pieces
}

fn bench_line_framer(c: &mut Criterion) {
    let body = sample_body();
    let chunks = split_fragments(&body, 64);
    c.bench_function("line_framer_64b_chunks", |b| {
        b.iter(|| {
            let mut framer = LineFramer::new();
            let mut lines = Vec::with_capacity(8);
            let mut total = 0usize;
            for chunk in &chunks {
                framer.feed_into(black_box(chunk), &mut lines);
                total += lines.len();
                lines.clear();
            }
            black_box(total)
        });
    });
}

fn bench_inline_tokenizer(c: &mut Criterion) {
    let tokenizer = InlineTokenizer::default();
    let mut content = String::from("Let me look that up. ");
    content.push_str("<|tool_calls_section_begin|><|tool_call_begin|>functions.search:0<|tool_call_argument_begin|>{\"query\":\"");
    for i in 0..100 {
        content.push_str(&format!("word{i} "));
    }
    content.push_str("\"}<|tool_call_end|><|tool_calls_section_end|>");

    let fragments = split_fragments(&content, 7);

    c.bench_function("inline_tokenizer_7b_fragments", |b| {
        b.iter(|| {
            let mut state = InlineState::default();
            let mut out = InlineEvents::new();
            for fragment in &fragments {
                tokenizer.feed(&mut state, black_box(fragment), &mut out);
            }
            tokenizer.finish(&mut state, &mut out);
            black_box(out.len())
        });
    });
}

fn bench_argument_probe(c: &mut Criterion) {
    let mut open = String::from("{\"query\":\"");
    open.push_str(&"x".repeat(4096));
    let closed = format!("{open}\"}}");

    c.bench_function("try_parse_object_open_4k", |b| {
        b.iter(|| black_box(try_parse_object(black_box(&open)).is_ready()));
    });
    c.bench_function("try_parse_object_closed_4k", |b| {
        b.iter(|| black_box(try_parse_object(black_box(&closed)).is_ready()));
    });
}

fn bench_full_stream(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let config = AppConfig::default();
    let body = Bytes::from(sample_body());

    c.bench_function("process_response_stream_sample", |b| {
        b.iter(|| {
            let chunks: Vec<Result<Bytes, Infallible>> = body
                .chunks(512)
                .map(|chunk| Ok(body.slice_ref(chunk)))
                .collect();
            let mut sink: Vec<ResponsePart> = Vec::with_capacity(256);
            let summary = runtime.block_on(process_response_stream(
                &config,
                futures_util::stream::iter(chunks),
                &mut sink,
                &CancellationToken::new(),
            ));
            black_box((summary.is_ok(), sink.len()))
        });
    });
}

criterion_group!(
    benches,
    bench_line_framer,
    bench_inline_tokenizer,
    bench_argument_probe,
    bench_full_stream
);
criterion_main!(benches);
