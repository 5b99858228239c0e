//! Model reply normalization
//!
//! The model is told to answer with a bare JSON object but routinely wraps
//! it in a code fence or surrounds it with prose. Replies are cleaned up
//! once here and turned into a [`ResolverOutcome`]; nothing downstream
//! re-checks field presence.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::ResolverOutcome;

static FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```(?:json|JSON)?[ \t]*\r?\n?(.*?)\s*```\z").expect("valid regex")
});

/// Result of normalizing one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Well-formed outcome
    Parsed(ResolverOutcome),
    /// Unusable reply
    Malformed { reason: String },
}

impl Normalized {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Normalize a raw model reply
///
/// 1. strip a surrounding ```` ```json ```` or bare ```` ``` ```` fence
/// 2. parse; failing that, parse the first `{` .. last `}` span
/// 3. require an object with a string `type` and the variant's fields
#[must_use]
pub fn normalize_reply(raw: &str) -> Normalized {
    let text = strip_fence(raw.trim());

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(direct_err) => {
            let Some(span) = brace_span(text) else {
                return Normalized::malformed(format!("no JSON object in reply ({direct_err})"));
            };
            match serde_json::from_str::<Value>(span) {
                Ok(value) => value,
                Err(e) => return Normalized::malformed(format!("invalid JSON object: {e}")),
            }
        }
    };

    decode(value)
}

/// Normalize a reply, substituting the fallback conversation on failure
///
/// Never fails.
#[must_use]
pub fn resolve_reply(raw: &str) -> ResolverOutcome {
    match normalize_reply(raw) {
        Normalized::Parsed(outcome) => outcome,
        Normalized::Malformed { reason } => {
            tracing::warn!(reason = %reason, reply = %raw, "malformed model reply, using fallback");
            ResolverOutcome::fallback()
        }
    }
}

fn strip_fence(text: &str) -> &str {
    FENCE_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str().trim())
}

/// Greedy span from the first `{` to the last `}`
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn decode(value: Value) -> Normalized {
    let Some(object) = value.as_object() else {
        return Normalized::malformed("reply is not a JSON object");
    };

    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        return Normalized::malformed("reply has no string `type` field");
    };
    let kind = kind.to_string();

    match serde_json::from_value::<ResolverOutcome>(value) {
        Ok(outcome) => Normalized::Parsed(outcome),
        Err(e) => Normalized::malformed(format!("invalid `{kind}` reply: {e}")),
    }
}
