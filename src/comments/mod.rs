//! Comment section: data types, backend client, anonymous identity, and the
//! session store that ties them together.

pub mod api;
pub mod identity;
pub mod store;
pub mod types;

pub use api::{ApiError, CommentsApi, HttpCommentsApi};
pub use identity::AnonymousUserId;
pub use store::{CommentError, CommentStore, CommentsView, LikeOutcome, REVEAL_STEP, StoreStatus};
pub use types::Comment;
