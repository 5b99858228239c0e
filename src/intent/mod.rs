//! Utterance to device-command interpretation
//!
//! The language model is an opaque text generator behind
//! [`LanguageModel`]; everything that makes its reply trustworthy
//! (instruction template, reply normalization, fallback) lives here and is
//! testable against canned replies.

mod model;
mod normalize;
mod prompt;
mod resolver;

use serde::{Deserialize, Serialize};

use crate::device::Command;

pub use model::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENAI_BASE_URL, GeminiModel, LanguageModel, OpenAiModel,
    build_model,
};
pub use normalize::{Normalized, normalize_reply, resolve_reply};
pub use prompt::build_prompt;
pub use resolver::{DEFAULT_MODEL_TIMEOUT, IntentResolver};

/// Reply used when the model's answer cannot be understood
pub const FALLBACK_MESSAGE: &str =
    "I had trouble understanding that command. Could you try rephrasing it?";

/// What the assistant made of an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverOutcome {
    /// Execute a device command
    Action { command: Command },
    /// Free-text reply, no device effect
    Conversation { message: String },
    /// Question back to the user
    Clarification { message: String },
    /// Recognized as a command, but not one the device supports
    Error { message: String },
}

impl ResolverOutcome {
    /// The fixed reply for unparseable model output
    #[must_use]
    pub fn fallback() -> Self {
        Self::Conversation {
            message: FALLBACK_MESSAGE.to_string(),
        }
    }

    /// User-facing text for this outcome
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Action { command } => format!("Understood: {command}."),
            Self::Conversation { message }
            | Self::Clarification { message }
            | Self::Error { message } => message.clone(),
        }
    }

    /// The command, for `Action` outcomes
    #[must_use]
    pub const fn command(&self) -> Option<&Command> {
        match self {
            Self::Action { command } => Some(command),
            _ => None,
        }
    }

    /// Wire tag (`action`, `conversation`, ...)
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Action { .. } => "action",
            Self::Conversation { .. } => "conversation",
            Self::Clarification { .. } => "clarification",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let outcome = ResolverOutcome::Action {
            command: Command::new("on", "garage_led"),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "type": "action", "command": { "action": "on", "target": "garage_led" } })
        );

        let value = serde_json::to_value(ResolverOutcome::fallback()).unwrap();
        assert_eq!(value["type"], "conversation");
        assert_eq!(value["message"], FALLBACK_MESSAGE);
    }

    #[test]
    fn message_and_kind() {
        let action = ResolverOutcome::Action {
            command: Command::new("open", "garage"),
        };
        assert_eq!(action.message(), "Understood: open garage.");
        assert_eq!(action.kind(), "action");
        assert!(action.command().is_some());

        let clarify = ResolverOutcome::Clarification {
            message: "Which light?".to_string(),
        };
        assert_eq!(clarify.message(), "Which light?");
        assert_eq!(clarify.kind(), "clarification");
        assert!(clarify.command().is_none());
    }
}
