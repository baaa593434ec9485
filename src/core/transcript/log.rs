//! Conversation transcript model.
//!
//! Accepted user turns and assistant responses accumulate here in arrival
//! order. Assistant text streams in incrementally, so consecutive assistant
//! updates collapse into one growing turn instead of one entry per delta.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One rendered line of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    /// RFC 3339 wall-clock time of the first delivery for this turn.
    pub timestamp: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, text)
    }
}

/// Ordered collection of conversation turns for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptLog {
    turns: Vec<ChatTurn>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted user turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ChatTurn::user(text));
    }

    /// Record assistant text. If the most recent turn is already an assistant
    /// turn this replaces its text in place (streamed deltas arrive as
    /// progressively longer snapshots); otherwise a new turn is appended.
    pub fn upsert_assistant(&mut self, text: impl Into<String>) {
        match self.turns.last_mut() {
            Some(turn) if turn.role == ChatRole::Assistant => {
                turn.text = text.into();
            }
            _ => self.turns.push(ChatTurn::assistant(text)),
        }
    }

    /// Route an already-built turn: user turns append, assistant turns
    /// collapse into the previous assistant turn. Keeps the turn's own
    /// timestamp.
    pub fn record(&mut self, turn: ChatTurn) {
        match turn.role {
            ChatRole::User => self.turns.push(turn),
            ChatRole::Assistant => match self.turns.last_mut() {
                Some(last) if last.role == ChatRole::Assistant => last.text = turn.text,
                _ => self.turns.push(turn),
            },
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turns_always_append() {
        let mut log = TranscriptLog::new();
        log.push_user("hello");
        log.push_user("hello");
        assert_eq!(log.len(), 2);
        assert!(log.turns().iter().all(|t| t.role == ChatRole::User));
    }

    #[test]
    fn test_assistant_updates_collapse() {
        let mut log = TranscriptLog::new();
        log.push_user("what time is it");
        log.upsert_assistant("It is");
        log.upsert_assistant("It is three");
        log.upsert_assistant("It is three o'clock.");
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns()[1].text, "It is three o'clock.");
    }

    #[test]
    fn test_user_turn_breaks_assistant_run() {
        let mut log = TranscriptLog::new();
        log.upsert_assistant("First answer.");
        log.push_user("next question");
        log.upsert_assistant("Second answer.");
        assert_eq!(log.len(), 3);
        assert_eq!(log.turns()[0].text, "First answer.");
        assert_eq!(log.turns()[2].text, "Second answer.");
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        let turn = ChatTurn::user("hi there");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));
    }
}
