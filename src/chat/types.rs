//! Chat types: conversation messages, errors, and the generator trait.

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by text-generation clients.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No API key was configured for the provider.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// MESSAGES
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(rename = "ai")]
    Assistant,
}

impl Sender {
    /// Speaker label used when replaying history into a prompt.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "ai",
        }
    }
}

/// One line of the assistant conversation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
}

// =============================================================================
// GENERATOR TRAIT
// =============================================================================

/// Provider-neutral single-prompt text generation. Enables mocking in tests.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatError`] if the request fails or the response is malformed.
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}
