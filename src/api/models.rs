use crate::models::{Message, ToolDefinition};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// `max_tokens` value the server reads as "no limit".
pub const UNLIMITED_MAX_TOKENS: i64 = -1;

#[derive(Debug, Serialize)]
pub struct RequestBody {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: i64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl RequestBody {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        stream: bool,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: UNLIMITED_MAX_TOKENS,
            stream,
            tools: tools.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// One fragment of a tool call inside a streaming delta.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: Option<u32>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: Option<String>,
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    pub delta: Option<Delta>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamResponse {
    pub choices: Option<Vec<StreamChoice>>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: Option<Message>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Option<Vec<CompletionChoice>>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub object: Option<String>,
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingUsage {
    pub prompt_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub object: Option<String>,
    pub data: Option<Vec<EmbeddingData>>,
    pub model: Option<String>,
    pub usage: Option<EmbeddingUsage>,
}
