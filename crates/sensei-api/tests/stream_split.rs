//! Chunk-boundary behavior of the delta parser and stream.
//!
//! The transport may split the body at any byte offset, including inside
//! a JSON payload or a multi-byte character. The delta sequence must not
//! depend on where the splits fall.

use futures_util::StreamExt;
use sensei_api::{ChatStream, DeltaParser, StreamItem};

fn delta_line(text: &str) -> String {
    format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n")
}

/// Three data records with multi-byte content, interleaved with comment
/// and blank lines, closed by the sentinel.
fn body() -> String {
    format!(
        ": keep-alive\n{}\n{}\n{}\ndata: [DONE]\n",
        delta_line("H\u{e9}llo"),
        delta_line(" w\u{f6}rld \u{1F600}"),
        delta_line("\u{4e16}\u{754c}!")
    )
}

const EXPECTED: [&str; 3] = ["H\u{e9}llo", " w\u{f6}rld \u{1F600}", "\u{4e16}\u{754c}!"];

fn parse_chunks(chunks: &[&[u8]]) -> (Vec<String>, u32) {
    let mut parser = DeltaParser::new();
    let mut deltas = Vec::new();
    let mut done = 0;
    let mut items: Vec<StreamItem> = Vec::new();
    for chunk in chunks {
        items.extend(parser.feed(chunk));
    }
    items.extend(parser.finish());
    for item in items {
        match item {
            StreamItem::Delta(text) => deltas.push(text),
            StreamItem::Done => done += 1,
        }
    }
    (deltas, done)
}

#[test]
fn every_two_chunk_split_gives_identical_output() {
    let body = body();
    let bytes = body.as_bytes();
    let baseline = parse_chunks(&[bytes]);
    assert_eq!(baseline.0, EXPECTED);
    assert_eq!(baseline.1, 1);

    for offset in 1..bytes.len() {
        let split = parse_chunks(&[&bytes[..offset], &bytes[offset..]]);
        assert_eq!(split, baseline, "split at byte {offset} diverged");
    }
}

#[test]
fn byte_at_a_time_gives_identical_output() {
    let body = body();
    let chunks: Vec<&[u8]> = body.as_bytes().chunks(1).collect();
    let (deltas, done) = parse_chunks(&chunks);
    assert_eq!(deltas, EXPECTED);
    assert_eq!(done, 1);
}

fn stream_from_chunks(chunks: Vec<Vec<u8>>) -> ChatStream {
    let byte_stream = futures_util::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, reqwest::Error>(bytes::Bytes::from(c)))
            .collect::<Vec<_>>(),
    );
    ChatStream::new(byte_stream)
}

async fn collect_deltas(mut stream: ChatStream) -> Vec<String> {
    let mut deltas = Vec::new();
    while let Some(result) = stream.next().await {
        deltas.push(result.expect("stream should not error"));
    }
    deltas
}

#[tokio::test]
async fn stream_single_chunk() {
    let stream = stream_from_chunks(vec![body().into_bytes()]);
    assert_eq!(collect_deltas(stream).await, EXPECTED);
}

#[tokio::test]
async fn stream_split_mid_json() {
    let body = body();
    // Land the split inside the second record's JSON payload.
    let offset = body.find("w\u{f6}rld").expect("marker present");
    let (a, b) = body.as_bytes().split_at(offset);
    let stream = stream_from_chunks(vec![a.to_vec(), b.to_vec()]);
    assert_eq!(collect_deltas(stream).await, EXPECTED);
}

#[tokio::test]
async fn stream_split_mid_utf8_char() {
    let body = body();
    // The emoji is four bytes; split one byte into it.
    let offset = body.find('\u{1F600}').expect("emoji present") + 1;
    let (a, b) = body.as_bytes().split_at(offset);
    let stream = stream_from_chunks(vec![a.to_vec(), b.to_vec()]);
    assert_eq!(collect_deltas(stream).await, EXPECTED);
}

#[tokio::test]
async fn stream_ends_on_sentinel_ignoring_trailing_lines() {
    let trailing = format!(
        "{}data: [DONE]\n{}data: {{malformed\n",
        delta_line("before"),
        delta_line("after")
    );
    let stream = stream_from_chunks(vec![trailing.into_bytes()]);
    assert_eq!(collect_deltas(stream).await, vec!["before"]);
}

#[tokio::test]
async fn stream_without_sentinel_flushes_at_eof() {
    // No [DONE]; the final record even lacks its newline.
    let body = format!("{}{}", delta_line("one"), delta_line("two"));
    let body = body.trim_end().to_string();
    let stream = stream_from_chunks(vec![body.into_bytes()]);
    assert_eq!(collect_deltas(stream).await, vec!["one", "two"]);
}

#[tokio::test]
async fn stream_drops_incomplete_trailing_record() {
    let body = format!("{}data: {{\"choices\":[{{\"del", delta_line("kept"));
    let stream = stream_from_chunks(vec![body.into_bytes()]);
    assert_eq!(collect_deltas(stream).await, vec!["kept"]);
}

#[tokio::test]
async fn stream_is_fused_after_termination() {
    let mut stream = stream_from_chunks(vec![body().into_bytes()]);
    while stream.next().await.is_some() {}
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());
}
