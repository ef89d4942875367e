//! Portfolio assistant conversation.
//!
//! DESIGN
//! ======
//! The session owns the transcript. `send` takes `&mut self`, so at most one
//! reply is outstanding and there is no pending flag for a dropped future to
//! leave set. Each send replays the last few turns into one prompt, since the
//! generator is stateless. A failed generation becomes an apology line in the
//! transcript; the caller never sees an error. A cancelled send leaves its
//! question in the transcript without a reply.

use std::sync::Arc;

use tracing::{info, warn};

use super::types::{ChatMessage, Sender, TextGenerator};

pub const GREETING: &str =
    "Hello! I'm your AI portfolio assistant. Ask me about my skills, projects, or experience!";
pub const APOLOGY: &str = "Sorry, I'm having trouble responding. Please try again later.";

/// Prior messages replayed into each prompt.
const HISTORY_WINDOW: usize = 5;

const PERSONA: &str = "You are an AI assistant for a professional portfolio website.
The user is a potential employer or client.
Answer questions professionally and keep responses concise.
The portfolio includes skills, projects, work experience, and services.";

/// What a [`ChatSession::send`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Replied,
    /// Generation failed; the apology line was appended instead.
    Apologized,
    /// Blank input. Nothing changed.
    Ignored,
}

pub struct ChatSession {
    generator: Arc<dyn TextGenerator>,
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ChatSession {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        let mut session = Self { generator, messages: Vec::new(), next_id: 0 };
        session.push(Sender::Assistant, GREETING.to_owned());
        session
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send `input` and append the reply (or an apology) to the transcript.
    pub async fn send(&mut self, input: &str) -> SendOutcome {
        if input.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let prompt = build_prompt(&self.messages, input);
        self.push(Sender::User, input.to_owned());

        let result = self.generator.generate(&prompt).await;

        match result {
            Ok(reply) => {
                info!(reply_len = reply.len(), "assistant replied");
                self.push(Sender::Assistant, strip_bold(&reply));
                SendOutcome::Replied
            }
            Err(e) => {
                warn!(error = %e, "assistant generation failed");
                self.push(Sender::Assistant, APOLOGY.to_owned());
                SendOutcome::Apologized
            }
        }
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.next_id += 1;
        self.messages.push(ChatMessage { id: self.next_id, sender, text });
    }
}

/// Prompt for `question`, carrying the last few entries of `history`.
#[must_use]
pub fn build_prompt(history: &[ChatMessage], question: &str) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let transcript: String = history[start..]
        .iter()
        .map(|message| format!("{}: {}\n", message.sender.label(), message.text))
        .collect();
    format!("{PERSONA}\n\nCurrent conversation:\n{transcript}\nUser question: {question}")
}

/// Remove markdown bold markers, which the transcript renders literally.
#[must_use]
pub fn strip_bold(text: &str) -> String {
    text.replace("**", "")
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
