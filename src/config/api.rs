use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Supports `${VAR}` expansion.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub stream_timeout: Option<u64>,
    #[serde(default)]
    pub request_timeout: Option<u64>,
}
