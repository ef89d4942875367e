//! Comment list state synchronized with the remote comments backend.
//!
//! DESIGN
//! ======
//! `CommentStore` is a cheap cloneable handle: every clone sees the same
//! state, so several event handlers can hold one. State sits behind a mutex
//! that is never held across an `.await`; each operation locks to check and
//! mark itself in flight, releases for the network call, then locks again to
//! apply the result.
//!
//! FAILURE MODEL
//! =============
//! No operation lets a backend failure escape as a panic or leave the store
//! loading:
//! - `load_all` failure empties the list and records a message.
//! - `submit` failure records the backend's message (or a transport error)
//!   and leaves the list alone.
//! - `like` failure applies the optimistic local fallback (+1, liked) and
//!   records nothing; [`LikeOutcome::FallbackApplied`] tells callers which
//!   branch ran.
//!
//! After [`CommentStore::detach`], results that arrive are dropped instead of
//! applied, so a dismissed view is never written to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::api::{ApiError, CommentsApi};
use super::identity::AnonymousUserId;
use super::types::{
    AUTHOR_MIN_CHARS, Comment, CommentDefaults, NewComment, RemoteComment, now_millis, now_rfc3339,
    truncate_author,
};

/// Comments exposed before any "load more".
pub const INITIAL_VISIBLE: usize = 3;
/// Default increment for [`CommentStore::reveal_more`].
pub const REVEAL_STEP: usize = 3;

pub const MISSING_FIELDS_MESSAGE: &str = "Please enter your name and comment.";
pub const AUTHOR_TOO_SHORT_MESSAGE: &str = "Name must be at least 6 characters.";

const ANONYMOUS_AUTHOR: &str = "Anonymous";

// =============================================================================
// TYPES
// =============================================================================

/// Outcome of the most recent remote operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    /// Compose-form input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Another submit, like, or load is still outstanding.
    #[error("another comment operation is in progress")]
    Busy,

    /// The backend could not be reached or refused the request.
    #[error(transparent)]
    Transport(#[from] ApiError),
}

/// Which branch a [`CommentStore::like`] call took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The backend accepted the like; the count came from its response.
    Confirmed,
    /// The backend call failed; the like was applied locally instead.
    FallbackApplied,
    /// The current user had already liked this comment. Nothing changed.
    AlreadyLiked,
    /// No comment with that id is loaded. Nothing changed.
    NotFound,
    /// Another operation is outstanding. Nothing changed.
    Busy,
}

/// Unsent compose-form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposeDraft {
    pub author: String,
    pub text: String,
}

/// Read-only snapshot for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentsView {
    /// The exposed prefix of the list, newest first.
    pub comments: Vec<Comment>,
    pub total: usize,
    pub has_more: bool,
    pub status: StoreStatus,
    pub busy: bool,
    pub error: Option<String>,
    pub draft: ComposeDraft,
}

#[derive(Debug)]
struct CommentState {
    comments: Vec<Comment>,
    visible: usize,
    status: StoreStatus,
    in_flight: usize,
    error: Option<String>,
    draft: ComposeDraft,
    detached: bool,
}

impl Default for CommentState {
    fn default() -> Self {
        Self {
            comments: Vec::new(),
            visible: INITIAL_VISIBLE,
            status: StoreStatus::Idle,
            in_flight: 0,
            error: None,
            draft: ComposeDraft::default(),
            detached: false,
        }
    }
}

impl CommentState {
    fn visible_count(&self) -> usize {
        self.visible.min(self.comments.len())
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct CommentStore {
    api: Arc<dyn CommentsApi>,
    user_id: AnonymousUserId,
    state: Arc<Mutex<CommentState>>,
}

impl CommentStore {
    #[must_use]
    pub fn new(api: Arc<dyn CommentsApi>, user_id: AnonymousUserId) -> Self {
        Self { api, user_id, state: Arc::new(Mutex::new(CommentState::default())) }
    }

    #[must_use]
    pub fn user_id(&self) -> &AnonymousUserId {
        &self.user_id
    }

    fn lock(&self) -> MutexGuard<'_, CommentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark an operation in flight. Mutating operations pass `exclusive` and
    /// are refused while anything else is outstanding.
    fn begin(&self, exclusive: bool) -> Option<InFlight> {
        let mut state = self.lock();
        if exclusive && state.in_flight > 0 {
            return None;
        }
        Some(self.mark_in_flight(&mut state))
    }

    fn mark_in_flight(&self, state: &mut CommentState) -> InFlight {
        state.in_flight += 1;
        state.status = StoreStatus::Loading;
        InFlight { state: Arc::clone(&self.state) }
    }

    // -------------------------------------------------------------------------
    // READ
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> CommentsView {
        let state = self.lock();
        let shown = state.visible_count();
        CommentsView {
            comments: state.comments[..shown].to_vec(),
            total: state.comments.len(),
            has_more: shown < state.comments.len(),
            status: state.status,
            busy: state.in_flight > 0,
            error: state.error.clone(),
            draft: state.draft.clone(),
        }
    }

    /// Every loaded comment, ignoring the reveal limit.
    #[must_use]
    pub fn comments(&self) -> Vec<Comment> {
        self.lock().comments.clone()
    }

    #[must_use]
    pub fn comment(&self, id: &str) -> Option<Comment> {
        self.lock().comments.iter().find(|c| c.id == id).cloned()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight > 0
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.lock().status
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.lock().visible_count()
    }

    // -------------------------------------------------------------------------
    // LOCAL
    // -------------------------------------------------------------------------

    /// Expose `step` more comments. The exposed count never exceeds the list.
    pub fn reveal_more(&self, step: usize) {
        let mut state = self.lock();
        state.visible = state.visible.saturating_add(step);
    }

    pub fn dismiss_error(&self) {
        self.lock().error = None;
    }

    /// Stop applying results; the owning view is gone.
    pub fn detach(&self) {
        self.lock().detached = true;
    }

    pub fn set_author_draft(&self, raw: &str) {
        self.lock().draft.author = truncate_author(raw);
    }

    pub fn set_text_draft(&self, raw: &str) {
        self.lock().draft.text = raw.to_owned();
    }

    // -------------------------------------------------------------------------
    // REMOTE
    // -------------------------------------------------------------------------

    /// Replace the list with the backend's collection.
    ///
    /// Never fails: on any error the list is cleared and the message recorded.
    pub async fn load_all(&self) {
        let Some(_flight) = self.begin(false) else {
            return;
        };
        let result = self.api.list().await;

        let mut state = self.lock();
        if state.detached {
            return;
        }
        match result {
            Ok(records) => {
                let comments = self.normalize_list(records);
                info!(count = comments.len(), "comments loaded");
                state.comments = comments;
                state.status = StoreStatus::Succeeded;
                state.error = None;
            }
            Err(e) => {
                warn!(error = %e, "loading comments failed");
                state.comments.clear();
                state.status = StoreStatus::Failed;
                state.error = Some(e.to_string());
            }
        }
    }

    /// Validate and send a new comment, prepending it on success.
    ///
    /// The error is also recorded on the store for display.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::Validation`] for missing or too-short input (no
    /// request is sent), [`CommentError::Busy`] while another operation is
    /// outstanding, and [`CommentError::Transport`] when the backend fails.
    pub async fn submit(&self, author: &str, text: &str) -> Result<Comment, CommentError> {
        let author = truncate_author(author.trim());
        let text = text.trim();
        if let Err(e) = validate(&author, text) {
            warn!(error = %e, "comment rejected before sending");
            self.lock().error = Some(e.to_string());
            return Err(e);
        }
        let Some(_flight) = self.begin(true) else {
            return Err(CommentError::Busy);
        };

        let request = NewComment::new(&author, text);
        let result = self.api.create(&request).await;

        let mut state = self.lock();
        match result {
            Ok(record) => {
                let comment = self.normalize_created(record, &author);
                info!(id = %comment.id, "comment submitted");
                if !state.detached {
                    state.comments.insert(0, comment.clone());
                    state.draft = ComposeDraft::default();
                    state.error = None;
                    state.status = StoreStatus::Succeeded;
                }
                Ok(comment)
            }
            Err(e) => {
                warn!(error = %e, "comment submission failed");
                if !state.detached {
                    state.error = Some(e.user_message());
                    state.status = StoreStatus::Failed;
                }
                Err(CommentError::Transport(e))
            }
        }
    }

    /// Submit whatever is in the compose draft.
    ///
    /// # Errors
    ///
    /// Same as [`CommentStore::submit`].
    pub async fn submit_draft(&self) -> Result<Comment, CommentError> {
        let draft = self.lock().draft.clone();
        self.submit(&draft.author, &draft.text).await
    }

    /// Like a comment once. After this resolves with `Confirmed` or
    /// `FallbackApplied`, the comment is liked and its count is at least one
    /// higher than before.
    pub async fn like(&self, comment_id: &str) -> LikeOutcome {
        let flight = {
            let mut state = self.lock();
            match state.comments.iter().find(|c| c.id == comment_id) {
                None => return LikeOutcome::NotFound,
                Some(c) if c.liked_by_current_user => return LikeOutcome::AlreadyLiked,
                Some(_) => {}
            }
            if state.in_flight > 0 {
                return LikeOutcome::Busy;
            }
            self.mark_in_flight(&mut state)
        };

        let result = self.api.like(comment_id, self.user_id.as_str()).await;

        let mut state = self.lock();
        let apply = !state.detached;
        let outcome = match result {
            Ok(response) => {
                state.status = StoreStatus::Succeeded;
                if let Some(comment) = state.find_mut(comment_id).filter(|_| apply) {
                    apply_confirmed_like(comment, response.likes);
                }
                LikeOutcome::Confirmed
            }
            Err(e) => {
                info!(id = %comment_id, error = %e, "like not confirmed; applying locally");
                state.status = StoreStatus::Failed;
                if let Some(comment) = state.find_mut(comment_id).filter(|_| apply) {
                    apply_fallback_like(comment);
                }
                LikeOutcome::FallbackApplied
            }
        };
        drop(state);
        drop(flight);
        outcome
    }

    // -------------------------------------------------------------------------
    // NORMALIZATION
    // -------------------------------------------------------------------------

    fn normalize_list(&self, records: Vec<RemoteComment>) -> Vec<Comment> {
        let stamp = now_millis();
        let created_at = now_rfc3339();
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let defaults = CommentDefaults {
                    id: format!("local-{stamp}-{index}"),
                    author: ANONYMOUS_AUTHOR.to_owned(),
                    created_at: created_at.clone(),
                };
                record.normalize(self.user_id.as_str(), defaults)
            })
            .collect()
    }

    fn normalize_created(&self, record: RemoteComment, author: &str) -> Comment {
        let defaults =
            CommentDefaults { id: now_millis().to_string(), author: author.to_owned(), created_at: now_rfc3339() };
        record.normalize(self.user_id.as_str(), defaults)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn validate(author: &str, text: &str) -> Result<(), CommentError> {
    if author.is_empty() || text.is_empty() {
        return Err(CommentError::Validation(MISSING_FIELDS_MESSAGE.to_owned()));
    }
    if author.chars().count() < AUTHOR_MIN_CHARS {
        return Err(CommentError::Validation(AUTHOR_TOO_SHORT_MESSAGE.to_owned()));
    }
    Ok(())
}

/// Success branch: trust the server count but never let it go backwards.
fn apply_confirmed_like(comment: &mut Comment, server_likes: u64) {
    comment.like_count = server_likes.max(comment.like_count.saturating_add(1));
    comment.liked_by_current_user = true;
}

/// Fallback branch: the backend did not confirm, so count the like locally.
fn apply_fallback_like(comment: &mut Comment) {
    comment.like_count = comment.like_count.saturating_add(1);
    comment.liked_by_current_user = true;
}

/// Releases the busy flag when an operation finishes or its future is dropped.
struct InFlight {
    state: Arc<Mutex<CommentState>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 && state.status == StoreStatus::Loading {
            state.status = StoreStatus::Idle;
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
