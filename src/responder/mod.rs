//! Reply generation from conversation history
//!
//! The [`Responder`] trait is the seam where a real generation backend would
//! plug in: it takes the ordered conversation history and returns a single
//! reply string. The bundled [`CannedResponder`] selects one of five fixed
//! paragraphs by keyword matching against the latest user turn.

pub mod replies;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Role of a conversation turn, using the wire names a generation API expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Human side of the conversation
    User,
    /// Reply side of the conversation
    Assistant,
}

/// One turn of conversation history handed to a responder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who authored the turn
    pub role: ChatRole,
    /// Turn text
    pub content: String,
}

impl ChatTurn {
    /// Create a user-authored turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant-authored turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Produces a reply string from conversation history
///
/// Implementations must be safe to call concurrently and should resolve
/// promptly; the orchestrator imposes no timeout.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply for the given history
    ///
    /// # Errors
    ///
    /// Returns error if reply generation fails. The orchestrator converts
    /// failures into a user-visible notification.
    async fn reply(&self, history: &[ChatTurn]) -> Result<String>;
}

/// Keyword-matching responder over a fixed table of five replies
///
/// Only the most recent user turn is considered; prior history never changes
/// the outcome. Pure string logic, so it cannot actually fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedResponder;

impl CannedResponder {
    /// Create a new canned responder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn reply(&self, history: &[ChatTurn]) -> Result<String> {
        Ok(reply_for(history).to_string())
    }
}

/// Select the fixed reply for the given history
///
/// The latest user turn is lower-cased and matched against the rule table in
/// priority order; the first match wins and rules never combine.
#[must_use]
pub fn reply_for(history: &[ChatTurn]) -> &'static str {
    let Some(turn) = history.iter().rev().find(|t| t.role == ChatRole::User) else {
        return replies::NO_QUESTION;
    };

    let question = turn.content.to_lowercase();
    tracing::debug!(question = %question, "matching canned reply");

    if question.contains("life story") {
        replies::LIFE_STORY
    } else if question.contains("superpower") {
        replies::SUPERPOWER
    } else if question.contains("areas") && question.contains("grow") {
        replies::GROWTH_AREAS
    } else if question.contains("misconception")
        || (question.contains("coworkers") && question.contains("about you"))
    {
        replies::MISCONCEPTION
    } else if question.contains("boundaries") || question.contains("limits") {
        replies::BOUNDARIES
    } else {
        replies::UNSUPPORTED_QUESTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_serialize_with_wire_role_names() {
        let turn = ChatTurn::user("hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));

        let turn = ChatTurn::assistant("hi");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn empty_history_returns_no_question() {
        assert_eq!(reply_for(&[]), replies::NO_QUESTION);
    }

    #[test]
    fn assistant_only_history_returns_no_question() {
        let history = vec![ChatTurn::assistant("Hi there!")];
        assert_eq!(reply_for(&history), replies::NO_QUESTION);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let history = vec![ChatTurn::user("WHAT'S YOUR SUPERPOWER?")];
        assert_eq!(reply_for(&history), replies::SUPERPOWER);
    }

    #[test]
    fn only_latest_user_turn_is_considered() {
        let history = vec![
            ChatTurn::user("tell me your life story"),
            ChatTurn::assistant(replies::LIFE_STORY),
            ChatTurn::user("how do you push your limits?"),
        ];
        assert_eq!(reply_for(&history), replies::BOUNDARIES);
    }

    #[test]
    fn misconception_matches_coworkers_phrasing() {
        let history = vec![ChatTurn::user(
            "what do your coworkers get wrong about you?",
        )];
        assert_eq!(reply_for(&history), replies::MISCONCEPTION);
    }

    #[test]
    fn growth_rule_requires_both_keywords() {
        let history = vec![ChatTurn::user("what areas do you work in?")];
        assert_eq!(reply_for(&history), replies::UNSUPPORTED_QUESTION);
    }
}
