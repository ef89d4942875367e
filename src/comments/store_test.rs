use super::*;
use crate::comments::types::LikeResponse;
use std::sync::atomic::{AtomicBool, Ordering};

// =========================================================================
// MockApi
// =========================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LikeMode {
    Accept,
    Status(u16),
    Transport,
    /// Accept but report a stale count from the server.
    StaleCount(u64),
}

struct MockApi {
    records: Mutex<Vec<RemoteComment>>,
    list_status: Mutex<Option<u16>>,
    create_error: Mutex<Option<(u16, String)>>,
    like_mode: Mutex<LikeMode>,
    calls: Mutex<Vec<&'static str>>,
    next_id: Mutex<u32>,
    gate_create: AtomicBool,
    gate: tokio::sync::Notify,
}

impl MockApi {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            list_status: Mutex::new(None),
            create_error: Mutex::new(None),
            like_mode: Mutex::new(LikeMode::Accept),
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
            gate_create: AtomicBool::new(false),
            gate: tokio::sync::Notify::new(),
        }
    }

    fn seed(&self, records: Vec<serde_json::Value>) {
        *self.records.lock().unwrap() =
            records.into_iter().map(|r| serde_json::from_value(r).unwrap()).collect();
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| **c == name).count()
    }
}

#[async_trait::async_trait]
impl CommentsApi for MockApi {
    async fn list(&self) -> Result<Vec<RemoteComment>, ApiError> {
        self.calls.lock().unwrap().push("list");
        if let Some(status) = *self.list_status.lock().unwrap() {
            return Err(ApiError::Response { status, message: "Failed to load comments".into() });
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create(&self, comment: &NewComment) -> Result<RemoteComment, ApiError> {
        self.calls.lock().unwrap().push("create");
        if self.gate_create.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        if let Some((status, message)) = self.create_error.lock().unwrap().clone() {
            return Err(ApiError::Response { status, message });
        }
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("srv-{next}")
        };
        let record = RemoteComment {
            id: Some(id),
            name: Some(comment.name.clone()),
            message: Some(comment.message.clone()),
            created_at: Some("2026-10-19T12:00:00Z".into()),
            ..RemoteComment::default()
        };
        self.records.lock().unwrap().insert(0, record.clone());
        Ok(record)
    }

    async fn like(&self, comment_id: &str, user_id: &str) -> Result<LikeResponse, ApiError> {
        self.calls.lock().unwrap().push("like");
        let mode = *self.like_mode.lock().unwrap();
        match mode {
            LikeMode::Status(status) => Err(ApiError::Response { status, message: "nope".into() }),
            LikeMode::Transport => Err(ApiError::Request("connection reset".into())),
            LikeMode::StaleCount(likes) => Ok(LikeResponse { likes, liked_by: vec![user_id.to_owned()] }),
            LikeMode::Accept => {
                let mut records = self.records.lock().unwrap();
                let record = records.iter_mut().find(|r| r.id.as_deref() == Some(comment_id)).unwrap();
                let likes = record.likes.unwrap_or(0) + 1;
                record.likes = Some(likes);
                record.liked_by.get_or_insert_with(Vec::new).push(user_id.to_owned());
                Ok(LikeResponse { likes, liked_by: record.liked_by.clone().unwrap_or_default() })
            }
        }
    }
}

fn store_with(api: &Arc<MockApi>) -> CommentStore {
    CommentStore::new(Arc::clone(api) as Arc<dyn CommentsApi>, AnonymousUserId::from("user-1"))
}

fn record(id: &str, likes: u64, liked_by: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("Author {id}"),
        "comment": format!("text {id}"),
        "createdAt": "2026-01-01T00:00:00Z",
        "likes": likes,
        "likedBy": liked_by,
    })
}

// =========================================================================
// load_all
// =========================================================================

#[tokio::test]
async fn load_all_maps_records_in_backend_order() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c2", 5, &["user-1"]), record("c1", 0, &[])]);
    let store = store_with(&api);

    store.load_all().await;

    let all = store.comments();
    assert_eq!(all.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["c2", "c1"]);
    assert!(all[0].liked_by_current_user);
    assert_eq!(all[0].like_count, 5);
    assert!(!all[1].liked_by_current_user);
    assert_eq!(store.status(), StoreStatus::Succeeded);
    assert!(!store.is_busy());
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn load_all_failure_empties_list_and_records_error() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    assert_eq!(store.comments().len(), 1);

    *api.list_status.lock().unwrap() = Some(500);
    store.load_all().await;

    assert!(store.comments().is_empty());
    assert!(store.error().is_some_and(|e| e.contains("500")));
    assert_eq!(store.status(), StoreStatus::Failed);
    assert!(!store.is_busy());
}

#[tokio::test]
async fn load_all_success_clears_previous_error() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);
    *api.list_status.lock().unwrap() = Some(503);
    store.load_all().await;
    assert!(store.error().is_some());

    *api.list_status.lock().unwrap() = None;
    store.load_all().await;
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn load_all_fills_missing_ids_uniquely() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![serde_json::json!({ "message": "a" }), serde_json::json!({ "message": "b" })]);
    let store = store_with(&api);

    store.load_all().await;

    let all = store.comments();
    assert_ne!(all[0].id, all[1].id);
    assert_eq!(all[0].author, "Anonymous");
}

// =========================================================================
// submit
// =========================================================================

#[tokio::test]
async fn submit_blank_fields_never_touch_network() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    let before = store.comments();

    for (author, text) in [("", "hello"), ("Alice Judge", "   "), ("  \t", "hello"), ("", "")] {
        let err = store.submit(author, text).await.unwrap_err();
        assert!(matches!(err, CommentError::Validation(ref m) if m == MISSING_FIELDS_MESSAGE));
    }

    assert_eq!(api.count("create"), 0);
    assert_eq!(store.comments(), before);
    assert_eq!(store.error().as_deref(), Some(MISSING_FIELDS_MESSAGE));
}

#[tokio::test]
async fn submit_short_author_is_rejected() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);

    let err = store.submit("  Bob  ", "hello").await.unwrap_err();

    assert!(matches!(err, CommentError::Validation(ref m) if m == AUTHOR_TOO_SHORT_MESSAGE));
    assert_eq!(api.count("create"), 0);
}

#[tokio::test]
async fn submit_success_prepends_and_clears_draft() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    store.set_author_draft("Alice Judge");
    store.set_text_draft("Great site!");

    let created = store.submit_draft().await.unwrap();

    let all = store.comments();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], created);
    assert_eq!(created.author, "Alice Judge");
    assert_eq!(created.text, "Great site!");
    assert_eq!(created.like_count, 0);
    assert!(!created.liked_by_current_user);
    assert_eq!(store.snapshot().draft, ComposeDraft::default());
    assert_eq!(store.status(), StoreStatus::Succeeded);
}

#[tokio::test]
async fn submit_truncates_author_to_twenty_chars() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);

    let created = store.submit("A very long display name indeed", "hi there").await.unwrap();

    assert_eq!(created.author, "A very long display ");
    assert_eq!(created.author.chars().count(), 20);
}

#[tokio::test]
async fn submit_failure_records_message_without_mutation() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    store.set_author_draft("Alice Judge");
    store.set_text_draft("Great site!");
    *api.create_error.lock().unwrap() = Some((400, "Name is required".into()));

    let err = store.submit_draft().await.unwrap_err();

    assert!(matches!(err, CommentError::Transport(ApiError::Response { status: 400, .. })));
    assert_eq!(store.comments().len(), 1);
    assert_eq!(store.error().as_deref(), Some("Name is required"));
    assert_eq!(store.snapshot().draft.text, "Great site!");
    assert_eq!(store.status(), StoreStatus::Failed);
    assert!(!store.is_busy());
}

#[tokio::test]
async fn submit_then_load_shows_comment_exactly_once() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);

    let created = store.submit("Alice Judge", "Great site!").await.unwrap();
    store.load_all().await;

    let matching = store.comments().into_iter().filter(|c| c.id == created.id).count();
    assert_eq!(matching, 1);
}

// =========================================================================
// like
// =========================================================================

#[tokio::test]
async fn like_success_uses_server_count() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 7, &[])]);
    let store = store_with(&api);
    store.load_all().await;

    assert_eq!(store.like("c1").await, LikeOutcome::Confirmed);

    let c = store.comment("c1").unwrap();
    assert_eq!(c.like_count, 8);
    assert!(c.liked_by_current_user);
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn like_stale_server_count_still_moves_forward() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 7, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    *api.like_mode.lock().unwrap() = LikeMode::StaleCount(2);

    assert_eq!(store.like("c1").await, LikeOutcome::Confirmed);
    assert_eq!(store.comment("c1").unwrap().like_count, 8);
}

#[tokio::test]
async fn like_failure_applies_local_fallback() {
    for mode in [LikeMode::Status(404), LikeMode::Status(500), LikeMode::Transport] {
        let api = Arc::new(MockApi::new());
        api.seed(vec![record("c1", 2, &[])]);
        let store = store_with(&api);
        store.load_all().await;
        *api.like_mode.lock().unwrap() = mode;

        assert_eq!(store.like("c1").await, LikeOutcome::FallbackApplied, "mode {mode:?}");

        let c = store.comment("c1").unwrap();
        assert_eq!(c.like_count, 3);
        assert!(c.liked_by_current_user);
        assert_eq!(store.error(), None);
        assert!(!store.is_busy());
    }
}

#[tokio::test]
async fn like_already_liked_is_noop() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 4, &["user-1"])]);
    let store = store_with(&api);
    store.load_all().await;
    let before = store.comment("c1").unwrap();

    assert_eq!(store.like("c1").await, LikeOutcome::AlreadyLiked);

    assert_eq!(store.comment("c1").unwrap(), before);
    assert_eq!(api.count("like"), 0);
}

#[tokio::test]
async fn like_twice_only_counts_once() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    *api.like_mode.lock().unwrap() = LikeMode::Status(404);

    assert_eq!(store.like("c1").await, LikeOutcome::FallbackApplied);
    assert_eq!(store.like("c1").await, LikeOutcome::AlreadyLiked);
    assert_eq!(store.comment("c1").unwrap().like_count, 1);
}

#[tokio::test]
async fn like_unknown_id_is_not_found() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);

    assert_eq!(store.like("missing").await, LikeOutcome::NotFound);
    assert_eq!(api.count("like"), 0);
}

// =========================================================================
// reveal_more
// =========================================================================

#[tokio::test]
async fn reveal_more_is_capped_and_monotonic() {
    let api = Arc::new(MockApi::new());
    api.seed((0..7).map(|i| record(&format!("c{i}"), 0, &[])).collect());
    let store = store_with(&api);
    store.load_all().await;

    let mut seen = vec![store.visible_count()];
    for _ in 0..5 {
        store.reveal_more(REVEAL_STEP);
        seen.push(store.visible_count());
    }

    assert_eq!(seen, vec![3, 6, 7, 7, 7, 7]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    let view = store.snapshot();
    assert_eq!(view.comments.len(), 7);
    assert!(!view.has_more);
}

#[test]
fn reveal_more_on_empty_list_exposes_nothing() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);
    store.reveal_more(REVEAL_STEP);
    let view = store.snapshot();
    assert!(view.comments.is_empty());
    assert_eq!(view.total, 0);
    assert!(!view.has_more);
}

#[tokio::test]
async fn snapshot_reports_has_more() {
    let api = Arc::new(MockApi::new());
    api.seed((0..4).map(|i| record(&format!("c{i}"), 0, &[])).collect());
    let store = store_with(&api);
    store.load_all().await;

    let view = store.snapshot();
    assert_eq!(view.comments.len(), INITIAL_VISIBLE);
    assert_eq!(view.total, 4);
    assert!(view.has_more);
}

// =========================================================================
// busy flag, errors, detach
// =========================================================================

#[tokio::test]
async fn busy_store_refuses_overlapping_writes() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;
    api.gate_create.store(true, Ordering::SeqCst);

    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.submit("Alice Judge", "first").await })
    };
    while !store.is_busy() {
        tokio::task::yield_now().await;
    }

    assert_eq!(store.status(), StoreStatus::Loading);
    assert!(store.snapshot().busy);
    assert_eq!(store.like("c1").await, LikeOutcome::Busy);
    assert!(matches!(store.submit("Alice Judge", "second").await, Err(CommentError::Busy)));

    api.gate.notify_one();
    pending.await.unwrap().unwrap();

    assert!(!store.is_busy());
    assert_eq!(api.count("create"), 1);
    assert_eq!(api.count("like"), 0);
}

#[tokio::test]
async fn dropped_operation_releases_busy_flag() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);
    api.gate_create.store(true, Ordering::SeqCst);

    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.submit("Alice Judge", "never lands").await })
    };
    while !store.is_busy() {
        tokio::task::yield_now().await;
    }
    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    assert!(!store.is_busy());
    assert_eq!(store.status(), StoreStatus::Idle);
}

#[tokio::test]
async fn dismiss_error_clears_message() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);
    store.submit("", "").await.unwrap_err();
    assert!(store.error().is_some());

    store.dismiss_error();
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn detached_store_ignores_late_results() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);

    store.detach();
    store.load_all().await;

    assert!(store.comments().is_empty());
    assert_eq!(api.count("list"), 1);
    assert!(!store.is_busy());
}

#[test]
fn author_draft_is_truncated_on_edit() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);
    store.set_author_draft("abcdefghijklmnopqrstuvwxyz");
    assert_eq!(store.snapshot().draft.author, "abcdefghijklmnopqrst");
}

// =========================================================================
// end-to-end scenario
// =========================================================================

#[tokio::test]
async fn empty_backend_submit_then_fallback_like() {
    let api = Arc::new(MockApi::new());
    let store = store_with(&api);

    store.load_all().await;
    assert!(store.comments().is_empty());
    assert_eq!(store.error(), None);

    let created = store.submit("Alice Judge", "Great site!").await.unwrap();
    let all = store.comments();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].author, "Alice Judge");
    assert_eq!(all[0].like_count, 0);
    assert!(!all[0].liked_by_current_user);

    *api.like_mode.lock().unwrap() = LikeMode::Status(404);
    assert_eq!(store.like(&created.id).await, LikeOutcome::FallbackApplied);

    let liked = store.comment(&created.id).unwrap();
    assert_eq!(liked.like_count, 1);
    assert!(liked.liked_by_current_user);
    assert_eq!(store.error(), None);
    assert_eq!(api.calls(), vec!["list", "create", "like"]);
}

#[tokio::test]
async fn likes_are_sent_as_the_store_user() {
    let api = Arc::new(MockApi::new());
    api.seed(vec![record("c1", 0, &[])]);
    let store = store_with(&api);
    store.load_all().await;

    assert_eq!(store.user_id().as_str(), "user-1");
    assert_eq!(store.like("c1").await, LikeOutcome::Confirmed);
    let liked_by = api.records.lock().unwrap()[0].liked_by.clone().unwrap_or_default();
    assert_eq!(liked_by, vec!["user-1".to_owned()]);
}
