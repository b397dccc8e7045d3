mod api;
mod defaults;
mod validation;

use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use api::ApiConfig;
pub use defaults::{
    default_request_timeout, default_stream, default_stream_timeout, is_truthy,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
};
pub use validation::{expand_env_var_in_string, normalize_endpoint};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
}

/// Settings a [`ChatSession`](crate::ChatSession) runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub embedding_model: String,
    pub stream: bool,
    /// Seconds without a body chunk before a stream is abandoned.
    pub stream_timeout: u64,
    /// Whole-request timeout for non-streaming calls.
    pub request_timeout: u64,
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            stream: default_stream(),
            stream_timeout: default_stream_timeout(),
            request_timeout: default_request_timeout(),
            verbose: false,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl AsRef<str>, model: impl Into<String>) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint.as_ref()),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_stream_timeout(mut self, secs: u64) -> Self {
        self.stream_timeout = secs;
        self
    }

    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        let json_config = JsonConfig::load()?;
        Ok(Self::resolve(args, &json_config, |key| env::var(key).ok()))
    }

    /// Layers CLI args over environment over file config over defaults.
    pub fn resolve<F>(args: &Args, json_config: &JsonConfig, env_var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = args
            .endpoint
            .clone()
            .or_else(|| env_var("LMCHAT_ENDPOINT"))
            .or(json_config.api.endpoint.clone())
            .map(|endpoint| normalize_endpoint(&endpoint))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| env_var("LMCHAT_MODEL"))
            .or(json_config.model.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_key = env_var("LMCHAT_API_KEY")
            .or_else(|| {
                json_config
                    .api
                    .api_key
                    .as_deref()
                    .map(expand_env_var_in_string)
            })
            .filter(|key| !key.is_empty());

        let system_prompt = args
            .system
            .clone()
            .or_else(|| env_var("LMCHAT_SYSTEM_PROMPT"))
            .or(json_config.model.system_prompt.clone())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let embedding_model = json_config
            .model
            .embedding_model
            .clone()
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());

        let stream = if args.no_stream {
            false
        } else {
            match env_var("LMCHAT_STREAM") {
                Some(v) => is_truthy(&v),
                None => json_config.api.stream.unwrap_or_else(default_stream),
            }
        };

        let stream_timeout = env_var("LMCHAT_STREAM_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .or(json_config.api.stream_timeout)
            .unwrap_or_else(default_stream_timeout);

        let request_timeout = env_var("LMCHAT_REQUEST_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .or(json_config.api.request_timeout)
            .unwrap_or_else(default_request_timeout);

        let verbose = args.verbose
            || env_var("LMCHAT_VERBOSE")
                .map(|v| is_truthy(&v))
                .or(json_config.session.verbose)
                .unwrap_or(false);

        ClientConfig {
            endpoint,
            model,
            api_key,
            system_prompt,
            embedding_model,
            stream,
            stream_timeout,
            request_timeout,
            verbose,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JsonConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl JsonConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // No config file found, return default
        Ok(JsonConfig::default())
    }

    /// YAML for `.yaml`/`.yml`, JSON otherwise.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str(&contents).with_context(|| {
                format!("Failed to parse YAML config file: {}", path.display())
            })?
        } else {
            serde_json::from_str(&contents).with_context(|| {
                format!("Failed to parse JSON config file: {}", path.display())
            })?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".lmchat.yaml"),
            PathBuf::from(".lmchat.yml"),
            PathBuf::from(".lmchat.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("lmchat");
            paths.push(config_dir.join("lmchat.yaml"));
            paths.push(config_dir.join("lmchat.yml"));
            paths.push(config_dir.join("lmchat.json"));
        }

        paths
    }
}
