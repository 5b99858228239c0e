//! Utterance pipeline: wake-word gate, intent resolver, device session
//!
//! Both entry points (typed chat and browser speech transcripts) run
//! through [`Assistant::handle_text`]; they differ only in whether the
//! wake word is required.

use std::sync::Arc;

use serde::Serialize;

use crate::device::{CommandResult, DeviceFailure, DeviceSession};
use crate::intent::{IntentResolver, ResolverOutcome};
use crate::wake_word::{GateDecision, WakeWordGate};
use crate::{Error, Result};

/// Reply when the wake word is heard with nothing after it
pub const MISSING_COMMAND_MESSAGE: &str = "I heard my name, but what is your command?";

/// Where an utterance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Typed chat
    Text,
    /// Speech transcript
    Voice,
}

/// Result of handling one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Not addressed to the assistant; nothing happened
    Ignored,
    /// The assistant answered, possibly after driving the device
    Replied {
        outcome: ResolverOutcome,
        device: Option<CommandResult>,
    },
}

impl Interaction {
    /// Text to display or speak back, `None` when ignored
    #[must_use]
    pub fn reply_text(&self) -> Option<String> {
        let Self::Replied { outcome, device } = self else {
            return None;
        };

        let ack = outcome.message();
        let text = match device {
            None => ack,
            Some(result) if result.success => format!("{ack} {}", result.message),
            Some(result) => match result.failure {
                Some(DeviceFailure::NotConfigured) => {
                    format!("{ack} But no device address is configured.")
                }
                Some(DeviceFailure::Unreachable) => {
                    format!("{ack} But the device is not reachable; test the connection first.")
                }
                _ => format!("{ack} But the device reported: {}", result.message),
            },
        };
        Some(text)
    }
}

/// The assistant: one gate, one resolver, one device session
#[derive(Debug)]
pub struct Assistant {
    gate: WakeWordGate,
    gate_text: bool,
    resolver: IntentResolver,
    session: Arc<DeviceSession>,
}

impl Assistant {
    /// Create an assistant
    #[must_use]
    pub fn new(
        gate: WakeWordGate,
        resolver: IntentResolver,
        session: Arc<DeviceSession>,
    ) -> Self {
        Self {
            gate,
            gate_text: true,
            resolver,
            session,
        }
    }

    /// Whether typed text must carry the wake word (default: yes)
    #[must_use]
    pub fn with_text_gating(mut self, enabled: bool) -> Self {
        self.gate_text = enabled;
        self
    }

    /// The device session commands are dispatched through
    #[must_use]
    pub const fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    /// Provider name of the resolver's model
    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.resolver.model_name()
    }

    /// Handle one utterance end to end
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for empty input
    /// - upstream model errors ([`Error::is_upstream`])
    pub async fn handle_text(&self, text: &str, channel: Channel) -> Result<Interaction> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("User input is required.".to_string()));
        }

        let gated = match channel {
            Channel::Voice => true,
            Channel::Text => self.gate_text,
        };

        let command_text = if gated {
            match self.gate.check(text) {
                GateDecision::NotAddressed => {
                    tracing::debug!(?channel, "utterance not addressed to assistant");
                    return Ok(Interaction::Ignored);
                }
                GateDecision::MissingCommand => {
                    return Ok(Interaction::Replied {
                        outcome: ResolverOutcome::Clarification {
                            message: MISSING_COMMAND_MESSAGE.to_string(),
                        },
                        device: None,
                    });
                }
                GateDecision::Addressed { command } => command,
            }
        } else {
            text.trim().to_string()
        };

        let outcome = self.resolver.classify(&command_text).await?;

        let device = match outcome.command() {
            Some(command) => {
                let result = self.session.send_command(command).await;
                tracing::info!(
                    command = %command,
                    success = result.success,
                    "device command dispatched"
                );
                Some(result)
            }
            None => None,
        };

        Ok(Interaction::Replied { outcome, device })
    }
}
