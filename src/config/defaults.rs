pub const DEFAULT_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "local-model";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-nomic-embed-text-v1.5";

pub fn default_stream() -> bool {
    true
}

pub fn default_stream_timeout() -> u64 {
    30
}

pub fn default_request_timeout() -> u64 {
    100
}

pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
