//! The fixed action set and classifier-output parsing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Actions the router can take for one user utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogAction {
    /// Account balance question
    CheckBalance,
    /// Status of an existing complaint or tracker
    QueryStatus,
    /// Register a new complaint
    GenerateComplaint,
    /// Escalation, cancellation, or explicit human-agent request
    RouteToCallAgent,
    /// Chit-chat, out-of-scope talk, or questions about the conversation
    AiReply,
    /// Farewell; terminal
    EndConversation,
}

/// Case-insensitive scan for the first canonical action name in the
/// classifier's raw output. Model output is unreliable free text, so no
/// exact-match parsing is attempted anywhere.
static ACTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(check_balance|query_status|generate_complaint|route_to_call_agent|ai_reply|END)\b",
    )
    .unwrap()
});

impl DialogAction {
    /// Canonical name, as the classification prompt spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckBalance => "check_balance",
            Self::QueryStatus => "query_status",
            Self::GenerateComplaint => "generate_complaint",
            Self::RouteToCallAgent => "route_to_call_agent",
            Self::AiReply => "ai_reply",
            Self::EndConversation => "END",
        }
    }

    /// Parse a raw classifier output
    ///
    /// The first canonical name appearing anywhere in the text wins.
    /// Output mentioning no action at all falls back to [`Self::AiReply`].
    pub fn parse(raw: &str) -> Self {
        match ACTION_PATTERN.find(raw) {
            Some(found) => match found.as_str().to_lowercase().as_str() {
                "check_balance" => Self::CheckBalance,
                "query_status" => Self::QueryStatus,
                "generate_complaint" => Self::GenerateComplaint,
                "route_to_call_agent" => Self::RouteToCallAgent,
                "end" => Self::EndConversation,
                _ => Self::AiReply,
            },
            None => Self::AiReply,
        }
    }

    /// Terminal actions end the interaction after their reply
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EndConversation)
    }
}

impl std::fmt::Display for DialogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
