//! Comment types and the wire shapes of the comments backend.
//!
//! DESIGN
//! ======
//! `RemoteComment` is lenient: every field is optional, a field of the wrong
//! JSON type reads as missing, and the body text may arrive as either
//! `comment` or `message`. All of that ambiguity is resolved in
//! [`RemoteComment::normalize`]; nothing past this module sees a wire record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Longest author name kept by the compose form.
pub const AUTHOR_MAX_CHARS: usize = 20;
/// Shortest accepted author name (after trimming).
pub const AUTHOR_MIN_CHARS: usize = 6;

const PLACEHOLDER_EMAIL_DOMAIN: &str = "comment.com";

// =============================================================================
// COMMENT
// =============================================================================

/// A comment as the view sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    /// RFC 3339 timestamp; "now" when the backend omitted it.
    pub created_at: String,
    pub like_count: u64,
    pub liked_by_current_user: bool,
}

/// Values used where a remote record leaves a field out.
#[derive(Clone, Debug)]
pub struct CommentDefaults {
    pub id: String,
    pub author: String,
    pub created_at: String,
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// A comment record as returned by `GET /api/contacts` or `POST /api/contacts`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteComment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub liked_by: Option<Vec<String>>,
}

impl RemoteComment {
    /// Body text from whichever of `comment` / `message` is non-empty.
    #[must_use]
    pub fn text(&self) -> &str {
        [&self.comment, &self.message]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|t| !t.is_empty())
            .unwrap_or("")
    }

    /// Map a wire record into the view shape for `user_id`.
    #[must_use]
    pub fn normalize(self, user_id: &str, defaults: CommentDefaults) -> Comment {
        let text = self.text().to_owned();
        let liked_by_current_user = self
            .liked_by
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| id == user_id));
        Comment {
            id: non_empty(self.id).unwrap_or(defaults.id),
            text,
            author: non_empty(self.name).unwrap_or(defaults.author),
            created_at: non_empty(self.created_at).unwrap_or(defaults.created_at),
            like_count: self.likes.unwrap_or(0),
            liked_by_current_user,
        }
    }
}

/// Body of `POST /api/contacts`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub message: String,
    pub comment: String,
}

impl NewComment {
    #[must_use]
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            name: author.to_owned(),
            email: placeholder_email(author),
            message: text.to_owned(),
            comment: text.to_owned(),
        }
    }
}

/// Body of `PATCH /api/contacts/{id}/like`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest<'a> {
    pub user_id: &'a str,
}

/// Success body of `PATCH /api/contacts/{id}/like`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes: u64,
    #[serde(default)]
    pub liked_by: Vec<String>,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Contact address the backend requires; derived from the author name since
/// the form never asks for one.
#[must_use]
pub fn placeholder_email(author: &str) -> String {
    let local = author.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase();
    format!("{local}@{PLACEHOLDER_EMAIL_DOMAIN}")
}

/// Clip an author name to [`AUTHOR_MAX_CHARS`] characters.
#[must_use]
pub fn truncate_author(raw: &str) -> String {
    raw.chars().take(AUTHOR_MAX_CHARS).collect()
}

/// Current time as RFC 3339.
#[must_use]
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Milliseconds since the Unix epoch, used for client-side fallback ids.
#[must_use]
pub fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(id_string))
}

fn string_only<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Like counts: a JSON number or a numeric string. Anything else is missing.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// `likedBy`: keeps string and numeric entries, drops the rest.
fn lenient_ids<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(items.into_iter().filter_map(id_string).collect()),
        _ => None,
    })
}

fn id_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
