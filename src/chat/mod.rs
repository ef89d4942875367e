//! Chat: the portfolio assistant widget's conversation and its generative
//! text provider.
//!
//! DESIGN
//! ======
//! `ChatSession` depends only on the [`TextGenerator`] trait. `GeminiClient`
//! is the one production implementation; tests supply their own.

pub mod gemini;
pub mod session;
pub mod types;

pub use gemini::GeminiClient;
pub use session::{ChatSession, SendOutcome};
pub use types::{ChatError, ChatMessage, Sender, TextGenerator};
