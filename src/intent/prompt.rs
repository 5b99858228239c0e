//! Instruction template sent with every utterance

use crate::device::vocabulary::vocabulary_listing;

const PREAMBLE: &str = "\
You are an AI assistant for a smart home system controlled by an ESP32.
Your goal is to understand the user's command and translate it into a specific action for the ESP32, or respond conversationally if it's not a command.

Available devices and actions (target names are case-sensitive as used in the ESP32 API):";

const RESPONSE_FORMAT: &str = r#"Response Format:
- If the user's query is a command for one of the above actions, respond with ONLY a JSON object:
  {"type": "action", "command": {"action": "ACTION_NAME", "target": "TARGET_NAME"}}
  Example: User says "Turn on the garage light". You respond: {"type": "action", "command": {"action": "on", "target": "garage_led"}}

- If the user's query is a general question, greeting, or something not related to a direct command, respond conversationally.
  In this case, respond with ONLY a JSON object:
  {"type": "conversation", "message": "Your conversational response here."}
  Example: User says "Hello". You respond: {"type": "conversation", "message": "Hello! How can I assist with your smart home today?"}

- If the user's command is ambiguous or unclear, ask for clarification.
  Respond with ONLY a JSON object:
  {"type": "clarification", "message": "Your clarification question here."}
  Example: User says "Turn off the light". You respond: {"type": "clarification", "message": "Which light would you like to turn off? The garage, room 1, or room 2 light?"}

- If the user's query is a command but for an unsupported action or device, inform them.
  Respond with ONLY a JSON object:
  {"type": "error", "message": "Sorry, I can't perform that action. I can control garage, window, door, specific LEDs, and the buzzer."}

IMPORTANT: Respond with ONLY the JSON object, no additional text or explanation."#;

/// Build the full prompt for one utterance
///
/// The user text is embedded as a JSON string literal so quotes and
/// newlines in it cannot break out of the query line.
#[must_use]
pub fn build_prompt(user_text: &str) -> String {
    let quoted = serde_json::to_string(user_text).unwrap_or_else(|_| format!("\"{user_text}\""));

    format!(
        "{PREAMBLE}\n{}\n\n{RESPONSE_FORMAT}\n\nUser query: {quoted}",
        vocabulary_listing()
    )
}
