use crate::api::accumulator::ToolCallAccumulator;
use crate::api::models::StreamResponse;
use crate::api::repair::repair_tool_calls;
use crate::error::{LmChatError, Result};
use crate::events::{EventSink, SessionEvent};
use crate::models::{Message, ToolCall};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub const DONE_SENTINEL: &str = "[DONE]";

/// The reconstructed assistant turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

impl StreamingResult {
    pub fn into_message(self) -> Message {
        if self.tool_calls.is_empty() {
            Message::assistant(self.content)
        } else {
            Message::assistant_with_tool_calls(self.tool_calls, Some(self.content))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed(StreamingResult),
    Cancelled,
}

/// What a single SSE line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Ignored,
    Content(String),
    ToolCallDelta,
    Done,
    Malformed,
}

/// Per-call reconstruction state, fed one SSE line at a time.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    full_text: String,
    tool_calls: ToolCallAccumulator,
    finish_reason: Option<String>,
    done: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn text(&self) -> &str {
        &self.full_text
    }

    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        if self.done {
            return LineOutcome::Ignored;
        }

        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() || line.starts_with(':') {
            return LineOutcome::Ignored;
        }

        let Some(colon_pos) = line.find(':') else {
            trace!("ignoring SSE line without field: {}", line);
            return LineOutcome::Ignored;
        };
        let field = line[..colon_pos].trim();
        let value = line[colon_pos + 1..].trim();

        match field {
            "data" => self.process_data(value),
            "event" | "id" | "retry" => {
                trace!("SSE {}: {}", field, value);
                LineOutcome::Ignored
            }
            _ => {
                trace!("unknown SSE field: {}", field);
                LineOutcome::Ignored
            }
        }
    }

    fn process_data(&mut self, payload: &str) -> LineOutcome {
        if payload == DONE_SENTINEL {
            self.done = true;
            return LineOutcome::Done;
        }

        let parsed = match serde_json::from_str::<StreamResponse>(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("skipping malformed stream chunk: {}", e);
                debug!("problematic chunk: {}", payload);
                return LineOutcome::Malformed;
            }
        };

        let Some(choice) = parsed.choices.and_then(|choices| choices.into_iter().next()) else {
            return LineOutcome::Ignored;
        };
        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }
        let Some(delta) = choice.delta else {
            return LineOutcome::Ignored;
        };

        let mut outcome = LineOutcome::Ignored;
        if let Some(tool_calls) = delta.tool_calls {
            for tool_call in &tool_calls {
                self.tool_calls.apply(tool_call);
            }
            if !tool_calls.is_empty() {
                outcome = LineOutcome::ToolCallDelta;
            }
        }
        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            self.full_text.push_str(&content);
            outcome = LineOutcome::Content(content);
        }
        outcome
    }

    /// Finalizes the turn, applying the argument repair pass to any tool calls.
    pub fn finish(self) -> StreamingResult {
        let mut tool_calls = self.tool_calls.finish();
        repair_tool_calls(&mut tool_calls);
        StreamingResult {
            content: self.full_text,
            tool_calls,
            finish_reason: self.finish_reason,
        }
    }
}

pub async fn process_streaming_response(
    response: reqwest::Response,
    timeout_secs: u64,
    cancel: &CancellationToken,
    events: &EventSink,
) -> Result<StreamOutcome> {
    reconstruct_stream(
        response.bytes_stream(),
        Duration::from_secs(timeout_secs),
        cancel,
        events,
    )
    .await
}

fn dispatch(state: &mut StreamAccumulator, line: &[u8], events: &EventSink) {
    let line = String::from_utf8_lossy(line);
    if let LineOutcome::Content(content) = state.process_line(&line) {
        events.emit(SessionEvent::ContentDelta(content));
    }
}

/// Drives a byte stream of SSE data through a [`StreamAccumulator`].
///
/// Cancellation is observed while waiting for each chunk and before each line.
/// Bytes are split on `\n` before decoding so multi-byte characters may
/// straddle chunk boundaries.
pub async fn reconstruct_stream<S, E>(
    mut stream: S,
    chunk_timeout: Duration,
    cancel: &CancellationToken,
    events: &EventSink,
) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<LmChatError>,
{
    let mut state = StreamAccumulator::new();
    let mut pending: Vec<u8> = Vec::new();

    'read: loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("stream cancelled while awaiting data");
                return Ok(StreamOutcome::Cancelled);
            }
            next = timeout(chunk_timeout, stream.next()) => next,
        };

        match next {
            Ok(Some(chunk)) => pending.extend_from_slice(&chunk.map_err(Into::<LmChatError>::into)?),
            Ok(None) => break,
            Err(_) => {
                warn!(
                    "no data received for {} seconds, giving up on stream",
                    chunk_timeout.as_secs()
                );
                return Err(LmChatError::Timeout);
            }
        }

        while let Some(line_end) = pending.iter().position(|b| *b == b'\n') {
            if cancel.is_cancelled() {
                debug!("stream cancelled between lines");
                return Ok(StreamOutcome::Cancelled);
            }
            let line: Vec<u8> = pending.drain(..=line_end).collect();
            dispatch(&mut state, &line, events);
            if state.is_done() {
                break 'read;
            }
        }
    }

    // Stream ended without a trailing newline.
    if !state.is_done() && !pending.is_empty() {
        if cancel.is_cancelled() {
            return Ok(StreamOutcome::Cancelled);
        }
        dispatch(&mut state, &pending, events);
    }

    if !state.is_done() {
        debug!("stream ended without {}", DONE_SENTINEL);
    }

    Ok(StreamOutcome::Completed(state.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comment_and_other_fields_are_ignored() {
        let mut state = StreamAccumulator::new();
        assert_eq!(state.process_line(""), LineOutcome::Ignored);
        assert_eq!(state.process_line("   "), LineOutcome::Ignored);
        assert_eq!(state.process_line(": keep-alive"), LineOutcome::Ignored);
        assert_eq!(state.process_line("event: message"), LineOutcome::Ignored);
        assert_eq!(state.process_line("not an sse line"), LineOutcome::Ignored);
    }

    #[test]
    fn sentinel_ends_stream_and_later_lines_are_ignored() {
        let mut state = StreamAccumulator::new();
        assert_eq!(state.process_line("data: [DONE]"), LineOutcome::Done);
        assert!(state.is_done());
        assert_eq!(
            state.process_line(r#"data: {"choices":[{"delta":{"content":"late"}}]}"#),
            LineOutcome::Ignored
        );
        assert_eq!(state.finish().content, "");
    }

    #[test]
    fn content_delta_is_accumulated() {
        let mut state = StreamAccumulator::new();
        let outcome = state.process_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#);
        assert_eq!(outcome, LineOutcome::Content("Hi".to_string()));
        state.process_line("data:{\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\r");
        assert_eq!(state.text(), "Hi!");
    }

    #[test]
    fn empty_content_is_not_reported() {
        let mut state = StreamAccumulator::new();
        let outcome = state.process_line(
            r#"data: {"choices":[{"delta":{"role":"assistant","content":""}}]}"#,
        );
        assert_eq!(outcome, LineOutcome::Ignored);
    }

    #[test]
    fn malformed_chunk_is_skipped() {
        let mut state = StreamAccumulator::new();
        assert_eq!(state.process_line("data: {\"choices\": [{"), LineOutcome::Malformed);
        assert!(!state.is_done());
    }

    #[test]
    fn finish_reason_is_recorded() {
        let mut state = StreamAccumulator::new();
        state.process_line(r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#);
        assert_eq!(state.finish().finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn tool_only_result_becomes_tool_call_message() {
        let mut state = StreamAccumulator::new();
        let outcome = state.process_line(
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"f","arguments":"{}"}}]}}]}"#,
        );
        assert_eq!(outcome, LineOutcome::ToolCallDelta);

        let message = state.finish().into_message();
        assert!(message.has_tool_calls());
        assert!(message.content.is_empty());
    }

    #[test]
    fn text_only_result_keeps_empty_text_block() {
        let message = StreamAccumulator::new().finish().into_message();
        assert!(!message.has_tool_calls());
        assert_eq!(message.content.len(), 1);
        assert_eq!(message.text(), "");
    }
}
