use serde::{Deserialize, Serialize};
use std::fmt;

/// A model known to the local server, as reported by `/api/v0/models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(rename = "type", default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub compatibility_type: Option<String>,
    #[serde(default)]
    pub quantization: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub max_context_length: u64,
}

fn eq_ignore_case(field: &Option<String>, expected: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|value| value.eq_ignore_ascii_case(expected))
}

impl ModelInfo {
    pub fn is_loaded(&self) -> bool {
        eq_ignore_case(&self.state, "loaded")
    }

    pub fn is_embedding_model(&self) -> bool {
        eq_ignore_case(&self.model_type, "embeddings")
    }

    pub fn is_language_model(&self) -> bool {
        eq_ignore_case(&self.model_type, "llm")
    }

    pub fn is_vision_model(&self) -> bool {
        eq_ignore_case(&self.model_type, "vlm")
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.id.as_deref().unwrap_or_default(),
            self.model_type.as_deref().unwrap_or_default(),
            self.state.as_deref().unwrap_or_default(),
            self.quantization.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsListResponse {
    #[serde(default)]
    pub object: Option<String>,
    pub data: Option<Vec<ModelInfo>>,
}
