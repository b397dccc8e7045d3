use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum LmChatError {
    ApiError {
        status: u16,
        message: String,
    },
    /// The first turn of a conversation carried no user text.
    EmptyMessage,
    ImageNotFound(PathBuf),
    ImageRead {
        path: PathBuf,
        source: std::io::Error,
    },
    ModelNotFound(String),
    InvalidInput(String),
    ConfigError(String),
    ToolError(String),
    InvalidResponse(String),
    NetworkError(reqwest::Error),
    Timeout,
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl LmChatError {
    /// Errors raised before any request reaches the server.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LmChatError::EmptyMessage
                | LmChatError::ImageNotFound(_)
                | LmChatError::ImageRead { .. }
                | LmChatError::InvalidInput(_)
        )
    }
}

impl fmt::Display for LmChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LmChatError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            LmChatError::EmptyMessage => {
                write!(f, "User message cannot be empty for the first message")
            }
            LmChatError::ImageNotFound(path) => {
                write!(f, "Image file not found: {}", path.display())
            }
            LmChatError::ImageRead { path, source } => {
                write!(f, "Failed to process image {}: {}", path.display(), source)
            }
            LmChatError::ModelNotFound(id) => write!(f, "Model '{}' not found", id),
            LmChatError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            LmChatError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LmChatError::ToolError(msg) => write!(f, "Tool error: {}", msg),
            LmChatError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            LmChatError::NetworkError(e) => write!(f, "Network error: {}", e),
            LmChatError::Timeout => write!(f, "Request timeout"),
            LmChatError::IoError(e) => write!(f, "IO error: {}", e),
            LmChatError::JsonError(e) => write!(f, "JSON error: {}", e),
            LmChatError::YamlError(e) => write!(f, "YAML error: {}", e),
            LmChatError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LmChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LmChatError::ImageRead { source, .. } => Some(source),
            LmChatError::NetworkError(e) => Some(e),
            LmChatError::IoError(e) => Some(e),
            LmChatError::JsonError(e) => Some(e),
            LmChatError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LmChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LmChatError::Timeout
        } else {
            LmChatError::NetworkError(err)
        }
    }
}

impl From<std::io::Error> for LmChatError {
    fn from(err: std::io::Error) -> Self {
        LmChatError::IoError(err)
    }
}

impl From<serde_json::Error> for LmChatError {
    fn from(err: serde_json::Error) -> Self {
        LmChatError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for LmChatError {
    fn from(err: serde_yaml::Error) -> Self {
        LmChatError::YamlError(err)
    }
}

impl From<anyhow::Error> for LmChatError {
    fn from(err: anyhow::Error) -> Self {
        LmChatError::Other(format!("{:#}", err))
    }
}

impl From<String> for LmChatError {
    fn from(msg: String) -> Self {
        LmChatError::Other(msg)
    }
}

impl From<&str> for LmChatError {
    fn from(msg: &str) -> Self {
        LmChatError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LmChatError>;
