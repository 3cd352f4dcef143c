//! Conversation turns and chat history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// User/caller message
    User,
    /// Assistant message
    Assistant,
    /// System message (instructions)
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// When the turn occurred
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    /// Get word count
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Ordered history of one session's conversation
///
/// The first entry, when present, is the system prompt. All appends keep
/// chronological order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    turns: Vec<Turn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history seeded with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(prompt)],
        }
    }

    /// Append a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns, system prompt included
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Last `n` non-system turns, oldest first
    pub fn recent(&self, n: usize) -> Vec<&Turn> {
        let non_system: Vec<&Turn> = self
            .turns
            .iter()
            .filter(|t| t.role != TurnRole::System)
            .collect();
        let start = non_system.len().saturating_sub(n);
        non_system[start..].to_vec()
    }

    /// Render the non-system turns as a numbered transcript
    ///
    /// Used by reply prompts that need positional references ("message 2").
    pub fn numbered_transcript(&self) -> String {
        self.turns
            .iter()
            .filter(|t| t.role != TurnRole::System)
            .enumerate()
            .map(|(i, t)| format!("{}. {}: {}", i + 1, t.role, t.content.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop everything, system prompt included
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = Turn::user("I want to check my balance");
        assert_eq!(turn.role, TurnRole::User);
        assert!(turn.word_count() > 0);
    }

    #[test]
    fn test_history_seeding() {
        let history = ChatHistory::with_system_prompt("You are a helpful agent.");
        assert_eq!(history.len(), 1);
        assert_eq!(history.turns()[0].role, TurnRole::System);
    }

    #[test]
    fn test_recent_skips_system() {
        let mut history = ChatHistory::with_system_prompt("sys");
        history.push(Turn::user("one"));
        history.push(Turn::assistant("two"));
        history.push(Turn::user("three"));

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "two");
        assert_eq!(recent[1].content, "three");

        // Asking for more than exists returns all non-system turns
        assert_eq!(history.recent(10).len(), 3);
    }

    #[test]
    fn test_numbered_transcript() {
        let mut history = ChatHistory::with_system_prompt("sys");
        history.push(Turn::user("hello"));
        history.push(Turn::assistant("hi there"));

        let transcript = history.numbered_transcript();
        assert_eq!(transcript, "1. user: hello\n2. assistant: hi there");
    }
}
