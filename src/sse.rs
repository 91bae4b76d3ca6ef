//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! The chat completions endpoint streams `data: <json>` events separated by blank lines and
//! finishes with `data: [DONE]`.  This module turns the raw byte stream of such a response into
//! [`StreamEvent`]s.  Bytes are buffered until a whole event is available, so events (and UTF-8
//! sequences) may be split across network chunks arbitrarily.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::types::{ChatCompletionChunk, StreamEvent};
use crate::{Error, Result};

/// Sentinel payload that terminates a completion stream.
const DONE: &str = "[DONE]";

/// Process a stream of bytes into a stream of server-sent events.
///
/// The returned stream ends after the `[DONE]` event or when the byte stream ends, whichever
/// comes first.  Transport errors are surfaced as [`Error::Streaming`].
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    stream::unfold(
        (stream, Vec::<u8>::new(), false),
        move |(mut stream, mut buffer, mut finished)| async move {
            if finished {
                return None;
            }
            loop {
                if let Some((end, rest)) = find_event_boundary(&buffer) {
                    let event_bytes: Vec<u8> = buffer.drain(..rest).take(end).collect();
                    match parse_event(&event_bytes) {
                        Some(Ok(StreamEvent::Done)) => {
                            return Some((Ok(StreamEvent::Done), (stream, buffer, true)));
                        }
                        Some(event) => return Some((event, (stream, buffer, finished))),
                        None => continue,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // A final event may arrive without its trailing blank line.
                        finished = true;
                        let event = parse_event(&buffer);
                        buffer.clear();
                        return event.map(|event| (event, (stream, buffer, finished)));
                    }
                }
            }
        },
    )
}

/// Locate the first blank line in `buffer`.
///
/// Returns the length of the event text preceding it and the offset at which the next event
/// starts.  Both `\n\n` and `\r\n\r\n` delimiters are accepted.
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    for (idx, byte) in buffer.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        match buffer.get(idx + 1) {
            Some(b'\n') => return Some((idx, idx + 2)),
            Some(b'\r') if buffer.get(idx + 2) == Some(&b'\n') => return Some((idx, idx + 3)),
            _ => {}
        }
    }
    None
}

/// Parse the text of one event.
///
/// Returns `None` for events that carry no data (comments, keep-alives, blank input).
fn parse_event(event_bytes: &[u8]) -> Option<Result<StreamEvent>> {
    let event_text = match std::str::from_utf8(event_bytes) {
        Ok(text) => text,
        Err(e) => {
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in event_text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some(value) = line.strip_prefix("data:") else {
            // `event:`, `id:` and `retry:` fields carry nothing for chat completions.
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    let data = data?;
    let data = data.trim();
    if data == DONE {
        return Some(Ok(StreamEvent::Done));
    }
    Some(parse_data(data))
}

#[derive(Deserialize)]
struct InlineError {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
    code: Option<serde_json::Value>,
}

fn parse_data(data: &str) -> Result<StreamEvent> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;

    if let Some(error) = value.get("error") {
        let inline: InlineError = serde_json::from_value(error.clone())?;
        let error_type = inline
            .error_type
            .or_else(|| inline.code.map(|code| code.to_string()));
        return Err(Error::api(
            500,
            error_type,
            inline.message.unwrap_or_else(|| error.to_string()),
            None,
        ));
    }

    let chunk: ChatCompletionChunk = serde_json::from_value(value)?;
    Ok(StreamEvent::Chunk(chunk))
}
