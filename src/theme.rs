//! Dark/light theme preference.
//!
//! DESIGN
//! ======
//! The theme is a plain `Copy` value read once from the [`LocalStore`] and
//! handed to whatever renders. Toggling returns a new value and persists it;
//! nothing reads the preference from ambient global state.

use tracing::warn;

use crate::storage::LocalStore;

const STORAGE_KEY: &str = "darkMode";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Read the stored preference. Anything other than `"true"` is light.
    #[must_use]
    pub fn read(store: &LocalStore) -> Self {
        if store.get(STORAGE_KEY) == Some("true") { Self::Dark } else { Self::Light }
    }

    /// Flip the stored preference and return the new theme.
    ///
    /// Persistence is best-effort; a failed write is logged and the flipped
    /// value is still returned.
    pub fn toggle(store: &mut LocalStore) -> Self {
        let next = Self::read(store).flipped();
        if let Err(e) = store.set(STORAGE_KEY, if next.is_dark() { "true" } else { "false" }) {
            warn!(error = %e, "failed to persist theme preference");
        }
        next
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }

    /// Value for a `data-theme` style attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "theme_test.rs"]
mod theme_test;
