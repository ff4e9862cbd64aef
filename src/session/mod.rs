//! Session abstraction: [`Message`], [`Session`], and the bounded
//! per-identity session list.
//!
//! A session is an append-only message log with a title derived from
//! its first user message.  An identity keeps at most `max` sessions;
//! adding one more evicts the oldest.  Everything here is in-memory;
//! durability lives in [`crate::store`].

pub mod id;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::truncate_with_marker;

/// Title every session starts with.
pub const DEFAULT_TITLE: &str = "New Chat";
/// Number of characters of the first user message kept in the title.
pub const TITLE_MAX_CHARS: usize = 30;
/// Appended to a title cut at [`TITLE_MAX_CHARS`].
pub const TITLE_ELLIPSIS: &str = "...";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
}

// ── Message ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Image bytes carried inline (base64) so the session never depends
/// on a file that may be gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub base64: String,
    pub timestamp: DateTime<Utc>,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub inline_image: Option<InlineImage>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            inline_image: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            inline_image: None,
        }
    }

    /// Assistant message carrying an inline image.
    pub fn assistant_image(content: impl Into<String>, image: InlineImage) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            inline_image: Some(image),
        }
    }
}

// ── Session ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub title: String,
    messages: Vec<Message>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh, empty session with a new id and the default title.
    pub fn new() -> Self {
        Self::restore(id::next_session_id(), DEFAULT_TITLE, Vec::new())
    }

    /// Rebuild a session from stored parts.
    pub fn restore(id: impl Into<String>, title: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            messages,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append `message`.  The first user message names the session
    /// while it still carries [`DEFAULT_TITLE`]; returns `true` when
    /// that happened.
    pub fn append(&mut self, message: Message) -> bool {
        let names_session = message.role == Role::User
            && self.title == DEFAULT_TITLE
            && !self.messages.iter().any(|m| m.role == Role::User);
        if names_session {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
        names_session
    }
}

/// First [`TITLE_MAX_CHARS`] characters of `content`, plus
/// [`TITLE_ELLIPSIS`] when cut.
pub fn derive_title(content: &str) -> String {
    truncate_with_marker(content, TITLE_MAX_CHARS, TITLE_ELLIPSIS)
}

// ── Bounded session list ─────────────────────────────────────

/// Append `session`, then drop the oldest entries until at most `max`
/// remain.
pub fn add_session(sessions: &mut Vec<Session>, session: Session, max: usize) {
    sessions.push(session);
    if sessions.len() > max {
        let excess = sessions.len() - max;
        sessions.drain(..excess);
    }
}

/// Replace the stored copy of `session` in place, or add it as the
/// newest entry when it is not stored yet.
pub fn upsert_session(sessions: &mut Vec<Session>, session: Session, max: usize) {
    match sessions.iter_mut().find(|s| s.id == session.id) {
        Some(slot) => *slot = session,
        None => add_session(sessions, session, max),
    }
}

/// Look up a stored session by id.
pub fn switch_to<'a>(sessions: &'a [Session], id: &str) -> Result<&'a Session, SessionError> {
    sessions
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| SessionError::NotFound(id.to_string()))
}

// ── Tests ────────────────────────────────────────────────────
