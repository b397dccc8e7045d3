use crate::api::RequestBody;
use crate::config::ClientConfig;
use crate::error::{LmChatError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Builds the HTTP client shared by a session and its auxiliary endpoints.
///
/// The bearer header is only attached when an API key is configured.
pub fn build_http_client(config: &ClientConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = config.api_key.as_deref() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LmChatError::ConfigError(format!("Invalid authorization header: {}", e)))?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(config.request_timeout))
        .build()?;
    Ok(client)
}

/// Sends a chat completion request. Streaming bodies are read by the caller.
pub async fn make_api_request(
    client: &Client,
    api_endpoint: &str,
    request_body: &RequestBody,
    request_timeout: Option<Duration>,
) -> Result<reqwest::Response> {
    debug!(
        "POST {} (model={}, messages={}, stream={})",
        api_endpoint,
        request_body.model,
        request_body.messages.len(),
        request_body.stream
    );

    let mut request = client.post(api_endpoint).json(request_body);
    if let Some(timeout) = request_timeout {
        request = request.timeout(timeout);
    }
    let response = request.send().await?;
    Ok(response)
}

/// Turns a non-2xx response into [`LmChatError::ApiError`].
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(LmChatError::ApiError { status, message })
}
