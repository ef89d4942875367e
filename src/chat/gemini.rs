//! Google Gemini `generateContent` client.
//!
//! Thin HTTP wrapper for `/models/{model}:generateContent`. Pure parsing in
//! `parse_response` for testability.

use reqwest::Url;
use tracing::debug;

use super::types::{ChatError, TextGenerator};
use crate::config::{GeminiConfig, HttpTimeouts};

const API_KEY_HEADER: &str = "x-goog-api-key";
const API_KEY_VAR: &str = "GEMINI_API_KEY";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: Url,
}

impl GeminiClient {
    /// Build a client from optional config.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MissingApiKey`] when no config is present, or an
    /// error if the endpoint URL or HTTP client cannot be built.
    pub fn from_config(config: Option<&GeminiConfig>, timeouts: HttpTimeouts) -> Result<Self, ChatError> {
        let config = config.ok_or_else(|| ChatError::MissingApiKey { var: API_KEY_VAR.to_owned() })?;
        Self::new(config, timeouts)
    }

    /// # Errors
    ///
    /// Returns an error if the endpoint URL or HTTP client cannot be built.
    pub fn new(config: &GeminiConfig, timeouts: HttpTimeouts) -> Result<Self, ChatError> {
        let raw = format!("{}/models/{}:generateContent", config.base_url, config.model);
        let endpoint = Url::parse(&raw).map_err(|e| ChatError::HttpClientBuild(format!("{raw}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ChatError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key.clone(), endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let body = ApiRequest { contents: vec![ApiContent { parts: vec![ApiPart { text: prompt.to_owned() }] }] };
        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "requesting generation");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ChatError::ApiRequest(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ChatError::ApiResponse { status, body: text });
        }

        parse_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize, serde::Deserialize)]
struct ApiRequest {
    contents: Vec<ApiContent>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ApiContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: String,
}

#[derive(serde::Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(serde::Deserialize)]
struct ApiCandidate {
    content: Option<ApiContent>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Concatenate the text parts of the first candidate.
fn parse_response(json: &str) -> Result<String, ChatError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| ChatError::ApiParse(e.to_string()))?;
    let candidate = api
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::ApiParse("response had no candidates".to_owned()))?;
    let content = candidate
        .content
        .ok_or_else(|| ChatError::ApiParse("candidate had no content".to_owned()))?;
    Ok(content.parts.into_iter().map(|p| p.text).collect())
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
