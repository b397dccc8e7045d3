use crate::api::client::ensure_success;
use crate::api::models::{EmbeddingRequest, EmbeddingResponse};
use crate::config::ClientConfig;
use crate::error::{LmChatError, Result};
use crate::models::{ModelInfo, ModelsListResponse};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const NATIVE_API_PATH: &str = "/api/v0";

/// Native REST base derived from the chat endpoint.
///
/// `http://host:1234/v1/chat/completions` becomes `http://host:1234/api/v0`.
/// Endpoints with another path fall back to the URL's origin.
pub fn native_api_base(chat_endpoint: &str) -> String {
    if let Some(prefix) = chat_endpoint.strip_suffix(CHAT_COMPLETIONS_PATH) {
        return format!("{}{}", prefix, NATIVE_API_PATH);
    }

    match Url::parse(chat_endpoint) {
        Ok(url) => format!(
            "{}{}",
            url.origin().ascii_serialization(),
            NATIVE_API_PATH
        ),
        Err(_) => format!("{}{}", chat_endpoint.trim_end_matches('/'), NATIVE_API_PATH),
    }
}

/// Model listing and embeddings against the server's native REST API.
#[derive(Debug, Clone)]
pub struct ModelsClient {
    client: Client,
    base_url: String,
    default_embedding_model: String,
    request_timeout: Duration,
}

impl ModelsClient {
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: native_api_base(&config.endpoint),
            default_embedding_model: config.embedding_model.clone(),
            request_timeout: Duration::from_secs(config.request_timeout),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_embedding_model(&self) -> &str {
        &self.default_embedding_model
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.base_url);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let list: ModelsListResponse = response.json().await?;
        Ok(list.data.unwrap_or_default())
    }

    pub async fn get_model(&self, model_id: &str) -> Result<ModelInfo> {
        if model_id.trim().is_empty() {
            return Err(LmChatError::InvalidInput(
                "Model ID cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/models/{}", self.base_url, model_id);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(LmChatError::ModelNotFound(model_id.to_string()));
        }
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    pub async fn loaded_models(&self) -> Result<Vec<ModelInfo>> {
        self.filtered(ModelInfo::is_loaded).await
    }

    pub async fn embedding_models(&self) -> Result<Vec<ModelInfo>> {
        self.filtered(ModelInfo::is_embedding_model).await
    }

    pub async fn language_models(&self) -> Result<Vec<ModelInfo>> {
        self.filtered(ModelInfo::is_language_model).await
    }

    pub async fn vision_models(&self) -> Result<Vec<ModelInfo>> {
        self.filtered(ModelInfo::is_vision_model).await
    }

    async fn filtered(&self, keep: fn(&ModelInfo) -> bool) -> Result<Vec<ModelInfo>> {
        let models = self.list_models().await?;
        Ok(models.into_iter().filter(|m| keep(m)).collect())
    }

    /// Embeds `text` with `model`, returning the first vector the server sends.
    pub async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LmChatError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }
        if model.trim().is_empty() {
            return Err(LmChatError::InvalidInput(
                "Model cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/embeddings", self.base_url);
        debug!("POST {} (model={})", url, model);
        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&EmbeddingRequest { model, input: text })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: EmbeddingResponse = response.json().await?;

        body.data
            .and_then(|data| data.into_iter().next())
            .and_then(|entry| entry.embedding)
            .ok_or_else(|| {
                LmChatError::InvalidResponse("Embedding response contained no data".to_string())
            })
    }

    /// One request per text, in order.
    pub async fn embed_batch<S: AsRef<str>>(&self, texts: &[S], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(LmChatError::InvalidInput(
                "Texts cannot be empty".to_string(),
            ));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text.as_ref(), model).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_base_replaces_chat_path() {
        assert_eq!(
            native_api_base("http://localhost:1234/v1/chat/completions"),
            "http://localhost:1234/api/v0"
        );
    }

    #[test]
    fn native_base_falls_back_to_origin() {
        assert_eq!(
            native_api_base("http://10.0.0.2:8080/openai/chat/completions"),
            "http://10.0.0.2:8080/api/v0"
        );
    }
}
