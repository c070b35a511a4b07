//! Stream transcoder tests.
//!
//! Property tests check that output does not depend on how the backend
//! happened to chunk its SSE bytes; the remaining tests pin down the
//! record format for representative streams.

use augment_proxy_rust::transformer::{StopCode, StreamTranscoder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Feed `chunks` through a fresh transcoder and return everything written.
fn transcode<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> String {
    let transcoder = StreamTranscoder::new(Vec::new());
    for chunk in chunks {
        transcoder.write(chunk).unwrap();
    }
    String::from_utf8(transcoder.finish().unwrap()).unwrap()
}

fn records(output: &str) -> Vec<Value> {
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Split `data` at the given (unsorted, possibly duplicate) offsets.
fn split_at_offsets(data: &[u8], offsets: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = offsets.iter().map(|o| o % (data.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(data[start..cut].to_vec());
        start = cut;
    }
    chunks.push(data[start..].to_vec());
    chunks
}

/// Generate one backend chat chunk.
fn event_strategy() -> impl Strategy<Value = Value> {
    (
        "[a-zA-Z0-9 .,é中]{0,16}",
        prop::option::of("[a-z ]{1,12}"),
        prop::option::of(prop::sample::select(vec![
            "stop",
            "length",
            "tool_calls",
            "content_filter",
        ])),
    )
        .prop_map(|(content, reasoning, finish)| {
            let mut delta = json!({ "content": content });
            if let Some(r) = reasoning {
                delta["reasoning_content"] = json!(r);
            }
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "choices": [{ "index": 0, "delta": delta, "finish_reason": finish }]
            })
        })
}

/// Generate a whole SSE body, with the occasional control line.
fn sse_body_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec(event_strategy(), 0..12), any::<bool>()).prop_map(|(events, done)| {
        let mut body = String::from("event: message\nid: 1\nretry: 3000\n");
        for event in events {
            body.push_str(&format!("data: {}\n\n", event));
        }
        if done {
            body.push_str("data: [DONE]\n\n");
        }
        body
    })
}

proptest! {
    /// Property: arbitrary chunk boundaries produce the same output
    #[test]
    fn prop_chunking_does_not_change_output(
        body in sse_body_strategy(),
        offsets in prop::collection::vec(any::<usize>(), 0..20),
    ) {
        let whole = transcode([body.as_bytes()]);
        let chunks = split_at_offsets(body.as_bytes(), &offsets);
        let split = transcode(chunks.iter().map(|c| c.as_slice()));
        prop_assert_eq!(whole, split);
    }

    /// Property: one record per data event, each newline-terminated
    #[test]
    fn prop_one_record_per_event(events in prop::collection::vec(event_strategy(), 1..10)) {
        let mut body = String::new();
        for event in &events {
            body.push_str(&format!("data: {}\n\n", event));
        }
        body.push_str("data: [DONE]\n\n");

        let output = transcode([body.as_bytes()]);
        prop_assert!(output.ends_with('\n'));

        let out = records(&output);
        prop_assert_eq!(out.len(), events.len());
        for (record, event) in out.iter().zip(&events) {
            prop_assert_eq!(&record["text"], &event["choices"][0]["delta"]["content"]);
        }
    }

    /// Property: a line that is not JSON is relayed verbatim
    #[test]
    fn prop_undecodable_payload_passes_through(garbage in "[a-z]{1,20}") {
        let output = transcode([format!("data: {}\n", garbage).as_bytes()]);
        prop_assert_eq!(output, format!("{}\n", garbage));
    }
}

#[test]
fn test_reasoning_then_answer_stream() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"reasoning_content\":\"Let me think\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Answer\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    let out = records(&transcode([body.as_bytes()]));
    assert_eq!(out.len(), 3);

    assert_eq!(out[0]["text"], "");
    assert_eq!(out[0]["nodes"][0]["type"], 8);
    assert_eq!(out[0]["nodes"][0]["thinking"]["summary"], "Let me think");
    assert_eq!(out[0]["stop_reason"], Value::Null);

    assert_eq!(out[1]["text"], "Answer");
    assert_eq!(out[1]["nodes"], json!([]));

    assert_eq!(out[2]["text"], "");
    assert_eq!(out[2]["stop_reason"], json!(StopCode::EndTurn.code()));
}

#[test]
fn test_finish_reasons_mapped() {
    let cases = [
        ("stop", 1),
        ("length", 2),
        ("tool_calls", 3),
        ("content_filter", 1),
        ("something_new", 1),
    ];
    for (reason, expected) in cases {
        let line = format!(
            "data: {{\"choices\":[{{\"delta\":{{}},\"finish_reason\":\"{}\"}}]}}\n",
            reason
        );
        let out = records(&transcode([line.as_bytes()]));
        assert_eq!(out[0]["stop_reason"], json!(expected), "finish_reason {}", reason);
    }
}

#[test]
fn test_trailing_line_without_newline_flushed() {
    let out = transcode([
        b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n".as_slice(),
        b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}".as_slice(),
    ]);
    let out = records(&out);
    assert_eq!(out.len(), 2);
    assert_eq!(out[1]["text"], "b");
}

#[test]
fn test_crlf_line_endings() {
    let out = transcode([b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\r\ndata: [DONE]\r\n".as_slice()]);
    let out = records(&out);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["text"], "x");
}

#[test]
fn test_multibyte_split_across_chunks() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo 世界\"}}]}\n".as_bytes();
    // Cut inside the two-byte 'é'
    let cut = body.iter().position(|&b| b == 0xC3).unwrap() + 1;

    let out = records(&transcode([&body[..cut], &body[cut..]]));
    assert_eq!(out[0]["text"], "héllo 世界");
}

#[test]
fn test_empty_stream_writes_nothing() {
    assert_eq!(transcode([b"".as_slice()]), "");
    assert_eq!(transcode([b"data: [DONE]\n\n".as_slice()]), "");
}

#[test]
fn test_concurrent_writers_keep_lines_whole() {
    const THREADS: usize = 8;
    const LINES: usize = 50;

    let transcoder = Arc::new(StreamTranscoder::new(Vec::new()));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let transcoder = Arc::clone(&transcoder);
            thread::spawn(move || {
                for i in 0..LINES {
                    let line = format!(
                        "data: {{\"choices\":[{{\"delta\":{{\"content\":\"t{}-{}\"}}}}]}}\n",
                        t, i
                    );
                    (&*transcoder).write_all(line.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let transcoder = Arc::try_unwrap(transcoder).ok().unwrap();
    let output = String::from_utf8(transcoder.finish().unwrap()).unwrap();
    let out = records(&output);
    assert_eq!(out.len(), THREADS * LINES);

    // Each writer's lines keep their relative order
    for t in 0..THREADS {
        let prefix = format!("t{}-", t);
        let seen: Vec<usize> = out
            .iter()
            .filter_map(|r| r["text"].as_str()?.strip_prefix(&prefix)?.parse().ok())
            .collect();
        assert_eq!(seen, (0..LINES).collect::<Vec<_>>());
    }
}

#[test]
fn test_flush_interleaved_with_writers() {
    const THREADS: usize = 4;
    const LINES: usize = 200;

    let transcoder = Arc::new(StreamTranscoder::new(Vec::new()));
    let done = Arc::new(AtomicBool::new(false));

    let flusher = {
        let transcoder = Arc::clone(&transcoder);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut flushes = 0usize;
            while !done.load(Ordering::SeqCst) {
                transcoder.flush().unwrap();
                flushes += 1;
                thread::yield_now();
            }
            flushes
        })
    };

    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let transcoder = Arc::clone(&transcoder);
            thread::spawn(move || {
                for i in 0..LINES {
                    let line = format!(
                        "data: {{\"choices\":[{{\"delta\":{{\"content\":\"w{}-{}\"}}}}]}}\n\n",
                        t, i
                    );
                    transcoder.write(line.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    assert!(flusher.join().unwrap() > 0);

    let transcoder = Arc::try_unwrap(transcoder).ok().unwrap();
    let output = String::from_utf8(transcoder.finish().unwrap()).unwrap();

    // Every line parses; none duplicated or dropped
    let out = records(&output);
    assert_eq!(out.len(), THREADS * LINES);
    for t in 0..THREADS {
        let prefix = format!("w{}-", t);
        let seen: Vec<usize> = out
            .iter()
            .filter_map(|r| r["text"].as_str()?.strip_prefix(&prefix)?.parse().ok())
            .collect();
        assert_eq!(seen, (0..LINES).collect::<Vec<_>>());
    }
}
