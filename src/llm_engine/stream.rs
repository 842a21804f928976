//! Incremental parser for streamed completion bodies
//!
//! The body is a sequence of newline-delimited records, usually SSE `data:` lines
//! carrying JSON. [`StreamIngestor`] turns raw byte chunks into text fragments;
//! [`ingest_stream`] wraps it around an HTTP byte stream.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;

use super::provider::{FragmentStream, LlmError};
use crate::{chunk_debug, chunk_trace};

const DONE_MARKERS: [&str; 2] = ["data: [DONE]", "data:[DONE]"];
const DATA_PREFIX: &str = "data:";
const LOG_PREVIEW_CHARS: usize = 80;

/// Where delta text may live inside a decoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaRule {
    /// `choices[0].delta.content` (OpenAI-style streaming chunk)
    ChoiceDelta,
    /// `choices[0].message.content` (whole-message chunk)
    ChoiceMessage,
    /// top-level `content` string
    TopLevelContent,
}

impl DeltaRule {
    /// Rules in the order they are tried
    pub const ORDERED: [DeltaRule; 3] = [
        DeltaRule::ChoiceDelta,
        DeltaRule::ChoiceMessage,
        DeltaRule::TopLevelContent,
    ];

    pub fn apply<'a>(&self, record: &'a Value) -> Option<&'a str> {
        match self {
            DeltaRule::ChoiceDelta => record
                .get("choices")?
                .get(0)?
                .get("delta")?
                .get("content")?
                .as_str(),
            DeltaRule::ChoiceMessage => record
                .get("choices")?
                .get(0)?
                .get("message")?
                .get("content")?
                .as_str(),
            DeltaRule::TopLevelContent => record.get("content")?.as_str(),
        }
    }
}

/// Extract delta text from a decoded record: the first non-empty rule match
pub fn extract_delta(record: &Value) -> Option<String> {
    DeltaRule::ORDERED
        .iter()
        .filter_map(|rule| rule.apply(record))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// The message of a top-level `error` field, if the record carries one
pub fn embedded_error(record: &Value) -> Option<String> {
    match record.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        error => Some(
            error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        ),
    }
}

/// Decode a non-streaming response body into the completion text
pub fn extract_completion(body: &[u8]) -> Result<String, LlmError> {
    let record: Value = serde_json::from_slice(body)
        .map_err(|e| LlmError::Protocol(format!("Invalid response: {}", e)))?;

    if let Some(message) = embedded_error(&record) {
        return Err(LlmError::Protocol(message));
    }

    extract_delta(&record)
        .ok_or_else(|| LlmError::Protocol("unexpected response format".to_string()))
}

enum LineOutcome {
    Skip,
    Fragment(String),
    Done,
    Fatal(LlmError),
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

/// Look for an error object in a line that is not JSON as a whole
fn salvage_error(payload: &str) -> Option<String> {
    if !payload.contains("error") {
        return None;
    }
    let start = payload.find('{')?;
    let record = serde_json::Deserializer::from_str(&payload[start..])
        .into_iter::<Value>()
        .next()?
        .ok()?;
    embedded_error(&record)
}

fn classify_line(raw: &str) -> LineOutcome {
    let line = raw.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }
    if DONE_MARKERS.contains(&line) {
        return LineOutcome::Done;
    }
    if line.starts_with(':') {
        chunk_trace!("Skipping stream comment: {}", preview(line));
        return LineOutcome::Skip;
    }

    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    };

    match serde_json::from_str::<Value>(payload) {
        Ok(record) => {
            if let Some(message) = embedded_error(&record) {
                return LineOutcome::Fatal(LlmError::Protocol(message));
            }
            match extract_delta(&record) {
                Some(text) => LineOutcome::Fragment(text),
                None => {
                    chunk_trace!("Record without delta text: {}", preview(payload));
                    LineOutcome::Skip
                }
            }
        }
        Err(e) => {
            if let Some(message) = salvage_error(payload) {
                return LineOutcome::Fatal(LlmError::Protocol(message));
            }
            log::warn!("Skipping malformed stream line ({}): {}", e, preview(payload));
            LineOutcome::Skip
        }
    }
}

/// Parsing state for one streamed response.
///
/// Bytes are buffered until a full line is available, so multi-byte characters
/// split across chunks are decoded intact. Output items keep source order; an
/// `Err` is always the last item ever produced.
#[derive(Debug, Default)]
pub struct StreamIngestor {
    buffer: Vec<u8>,
    done: bool,
    fragments_emitted: usize,
}

impl StreamIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True after `[DONE]`, a fatal error, or `finish`
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one body chunk and collect the items of every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, LlmError>> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }

        self.buffer.extend_from_slice(chunk);
        chunk_trace!("Stream chunk of {} bytes, {} buffered", chunk.len(), self.buffer.len());

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.handle_line(&line, &mut out);
            if self.done {
                break;
            }
        }

        out
    }

    /// End of body: parse any unterminated remainder once, then stop
    pub fn finish(&mut self) -> Vec<Result<String, LlmError>> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }

        let remainder = std::mem::take(&mut self.buffer);
        if !remainder.is_empty() {
            self.handle_line(&remainder, &mut out);
        }
        self.done = true;

        chunk_debug!("Stream finished after {} fragments", self.fragments_emitted);
        out
    }

    fn handle_line(&mut self, line: &[u8], out: &mut Vec<Result<String, LlmError>>) {
        let text = String::from_utf8_lossy(line);
        match classify_line(&text) {
            LineOutcome::Skip => {}
            LineOutcome::Fragment(fragment) => {
                self.fragments_emitted += 1;
                out.push(Ok(fragment));
            }
            LineOutcome::Done => {
                chunk_debug!("Stream terminated by [DONE] after {} fragments", self.fragments_emitted);
                self.stop();
            }
            LineOutcome::Fatal(err) => {
                log::warn!("Stream carried an error: {}", err);
                out.push(Err(err));
                self.stop();
            }
        }
    }

    fn stop(&mut self) {
        self.done = true;
        self.buffer.clear();
    }
}

struct IngestState<S> {
    body: Pin<Box<S>>,
    ingestor: StreamIngestor,
    pending: VecDeque<Result<String, LlmError>>,
    exhausted: bool,
}

/// Turn a byte stream into a lazy stream of text fragments.
///
/// Ends at `[DONE]`, at the end of the body, or after the first error item.
/// A failing byte source becomes a `RequestFailed` item.
pub fn ingest_stream<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = IngestState {
        body: Box::pin(body),
        ingestor: StreamIngestor::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.exhausted || state.ingestor.is_done() {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let items = state.ingestor.push(chunk.as_ref());
                    state.pending.extend(items);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    state
                        .pending
                        .push_back(Err(LlmError::RequestFailed(format!("Stream error: {}", e))));
                }
                None => {
                    state.exhausted = true;
                    let items = state.ingestor.finish();
                    state.pending.extend(items);
                }
            }
        }
    }))
}
