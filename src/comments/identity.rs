//! Anonymous per-client user id used to deduplicate likes.
//!
//! This is a soft tracking key, not a credential: it is generated locally,
//! never verified, and anyone can copy or forge it.

use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::LocalStore;

const STORAGE_KEY: &str = "userId";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnonymousUserId(String);

impl AnonymousUserId {
    /// Return the stored id, generating and persisting a fresh one on first run.
    ///
    /// If persisting fails the generated id is still used for this session.
    pub fn load_or_create(store: &mut LocalStore) -> Self {
        if let Some(existing) = store.get(STORAGE_KEY).filter(|v| !v.trim().is_empty()) {
            return Self(existing.to_owned());
        }
        let id = Uuid::new_v4().to_string();
        match store.set(STORAGE_KEY, &id) {
            Ok(()) => info!(user_id = %id, "generated anonymous user id"),
            Err(e) => warn!(error = %e, "anonymous user id not persisted; using it for this session only"),
        }
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnonymousUserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for AnonymousUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;
