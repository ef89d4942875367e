//! REST client for the remote comments backend.
//!
//! ERROR HANDLING
//! ==============
//! Every failure (connect error, timeout, non-2xx status, undecodable body)
//! comes back as an [`ApiError`]. The store decides what each failure means
//! for the view; this layer only classifies. Parsing lives in free functions
//! so it can be tested without a server.

use reqwest::Url;
use tracing::{debug, warn};

use super::types::{LikeRequest, LikeResponse, NewComment, RemoteComment};
use crate::config::HttpTimeouts;

const CONTACTS_SEGMENTS: [&str; 2] = ["api", "contacts"];
const LIST_FAILED_MESSAGE: &str = "Failed to load comments";
const CREATE_FAILED_MESSAGE: &str = "Failed to submit comment";
const LIKE_FAILED_MESSAGE: &str = "Failed to like comment";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The base URL cannot carry `/api/contacts` paths.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Transport failure: connect error, timeout, or body read failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Response { status: u16, message: String },

    /// A success body did not have the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// HTTP status for [`ApiError::Response`], `None` otherwise.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text to show the user: the backend's own message for a rejected
    /// request, the full error otherwise.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Response { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// `true` when the backend reported the route or record missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// The three backend operations the comment store depends on. Enables
/// in-memory fakes in tests.
#[async_trait::async_trait]
pub trait CommentsApi: Send + Sync {
    /// `GET /api/contacts`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or non-success status.
    async fn list(&self) -> Result<Vec<RemoteComment>, ApiError>;

    /// `POST /api/contacts`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or non-success status.
    async fn create(&self, comment: &NewComment) -> Result<RemoteComment, ApiError>;

    /// `PATCH /api/contacts/{id}/like`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or non-success status.
    async fn like(&self, comment_id: &str, user_id: &str) -> Result<LikeResponse, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpCommentsApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpCommentsApi {
    /// Build a client for `base_url` with bounded request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is unusable or the HTTP client fails to build.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, extra: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(CONTACTS_SEGMENTS)
            .extend(extra);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, failure: &str) -> Result<String, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Response { status: status.as_u16(), message: error_message(&text, failure) });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl CommentsApi for HttpCommentsApi {
    async fn list(&self) -> Result<Vec<RemoteComment>, ApiError> {
        let url = self.endpoint(&[])?;
        debug!(%url, "listing comments");
        let text = self.send(self.http.get(url), LIST_FAILED_MESSAGE).await?;
        parse_comment_list(&text)
    }

    async fn create(&self, comment: &NewComment) -> Result<RemoteComment, ApiError> {
        let url = self.endpoint(&[])?;
        debug!(%url, author = %comment.name, "creating comment");
        let text = self.send(self.http.post(url).json(comment), CREATE_FAILED_MESSAGE).await?;
        parse_created_comment(&text)
    }

    async fn like(&self, comment_id: &str, user_id: &str) -> Result<LikeResponse, ApiError> {
        let url = self.endpoint(&[comment_id, "like"])?;
        debug!(%url, "liking comment");
        let body = LikeRequest { user_id };
        let text = self.send(self.http.patch(url).json(&body), LIKE_FAILED_MESSAGE).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode a list body. A success body that is not a JSON array counts as an
/// empty collection. Records are decoded one at a time; an element that is
/// not a record is skipped so it cannot blank the rest of the list.
fn parse_comment_list(text: &str) -> Result<Vec<RemoteComment>, ApiError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<RemoteComment>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "skipping undecodable comment record");
                None
            }
        })
        .collect())
}

fn parse_created_comment(text: &str) -> Result<RemoteComment, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

/// The backend's `error` string when it sent one, `fallback` otherwise.
fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(serde_json::Value::as_str).map(str::to_owned))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
