//! Portfolio site client core.
//!
//! DESIGN
//! ======
//! Everything here is presentation-free. The comment store, chat assistant,
//! and theme preference expose plain state plus async operations; whatever
//! renders them (the CLI, a web front-end) reads snapshots and forwards user
//! events. Remote services sit behind async traits so tests can swap them.

pub mod chat;
pub mod comments;
pub mod config;
pub mod storage;
pub mod theme;

pub use config::PortfolioConfig;
pub use storage::LocalStore;
pub use theme::Theme;
