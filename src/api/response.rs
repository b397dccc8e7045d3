use crate::api::repair::repair_tool_calls;
use crate::api::streaming::StreamingResult;
use crate::error::{LmChatError, Result};
use crate::models::ToolCall;
use serde_json::Value;
use tracing::{debug, warn};

fn first_choice(response_json: &Value) -> Result<&Value> {
    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| LmChatError::InvalidResponse("No choices in response".to_string()))?;

    choices
        .first()
        .ok_or_else(|| LmChatError::InvalidResponse("Empty choices array".to_string()))
}

fn first_message(response_json: &Value) -> Result<&Value> {
    first_choice(response_json)?
        .get("message")
        .ok_or_else(|| LmChatError::InvalidResponse("No message in response".to_string()))
}

/// Parse a non-streaming API response and extract tool calls if present
pub fn parse_tool_calls(response_json: &Value) -> Result<Option<Vec<Value>>> {
    let message = first_message(response_json)?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(|tc| tc.as_array()) {
        if !tool_calls.is_empty() {
            return Ok(Some(tool_calls.clone()));
        }
    }

    Ok(None)
}

/// Extract content from a non-streaming response
pub fn extract_content(response_json: &Value) -> Result<Option<String>> {
    let message = first_message(response_json)?;

    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string()))
}

pub fn extract_finish_reason(response_json: &Value) -> Option<String> {
    first_choice(response_json)
        .ok()?
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
}

/// Decodes a whole completion into the same shape the stream engine produces.
///
/// Tool calls that fail to deserialize are skipped. The argument repair pass
/// runs over the rest.
pub fn parse_completion(response_json: &Value) -> Result<StreamingResult> {
    let content = extract_content(response_json)?.unwrap_or_default();

    let mut tool_calls: Vec<ToolCall> = parse_tool_calls(response_json)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| match serde_json::from_value(tc) {
            Ok(call) => Some(call),
            Err(e) => {
                warn!("skipping unparseable tool call: {}", e);
                None
            }
        })
        .collect();
    repair_tool_calls(&mut tool_calls);

    let finish_reason = extract_finish_reason(response_json);
    debug!(
        "decoded completion: {} chars, {} tool calls, finish_reason={:?}",
        content.len(),
        tool_calls.len(),
        finish_reason
    );

    Ok(StreamingResult {
        content,
        tool_calls,
        finish_reason,
    })
}

pub async fn process_non_streaming_response(response: reqwest::Response) -> Result<StreamingResult> {
    let response_text = response.text().await?;
    debug!("raw response: {}", response_text);
    let response_json: Value = serde_json::from_str(&response_text)?;
    parse_completion(&response_json)
}
