//! Wake word gating
//!
//! Decides whether an utterance is addressed to the assistant. Matching is
//! per token and fuzzy so transcription noise ("serious", "sirus") still
//! wakes it. A wake word anywhere in the utterance counts, not only at the
//! start.
//!
//! Every spelling shares the edit budget of the primary (first) wake word,
//! so a short alternate never widens the match to words like "sir".

/// Default wake word spellings and near-homophones
pub const DEFAULT_WAKE_WORDS: &[&str] = &["sirius", "syrius", "cirius"];

/// Default carrier words that may precede the wake word
pub const DEFAULT_CARRIERS: &[&str] = &["hey", "hi", "hello", "ok", "okay"];

/// Leading punctuation trimmed from the remainder
const LEADING_PUNCTUATION: &[char] = &[',', '.', '!', '?', ':', ';', '-'];

/// Result of gating one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// No wake word; the utterance is ignored
    NotAddressed,
    /// Wake word but nothing after it
    MissingCommand,
    /// Wake word found; `command` is the utterance without it
    Addressed { command: String },
}

/// Fuzzy wake word matcher
#[derive(Debug, Clone)]
pub struct WakeWordGate {
    wake_words: Vec<String>,
    carriers: Vec<String>,
    max_distance: usize,
}

impl Default for WakeWordGate {
    fn default() -> Self {
        Self::new(
            DEFAULT_WAKE_WORDS.iter().map(ToString::to_string).collect(),
            DEFAULT_CARRIERS.iter().map(ToString::to_string).collect(),
        )
    }
}

impl WakeWordGate {
    /// Create a gate
    ///
    /// # Arguments
    ///
    /// * `wake_words` - Accepted spellings (e.g., "sirius")
    /// * `carriers` - Words dropped when directly before the wake word (e.g., "hey")
    #[must_use]
    pub fn new(wake_words: Vec<String>, carriers: Vec<String>) -> Self {
        let wake_words: Vec<String> = wake_words
            .iter()
            .map(|w| normalize_token(w))
            .filter(|w| !w.is_empty())
            .collect();
        let carriers: Vec<String> = carriers
            .iter()
            .map(|w| normalize_token(w))
            .filter(|w| !w.is_empty())
            .collect();

        let budget = wake_words.first().map_or(0, |w| max_distance(w));

        tracing::debug!(
            wake_words = ?wake_words,
            carriers = ?carriers,
            budget,
            "wake word gate initialized"
        );

        Self {
            wake_words,
            carriers,
            max_distance: budget,
        }
    }

    /// Configured wake words (normalized)
    #[must_use]
    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }

    /// Primary wake word, used in user-facing hints
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.wake_words.first().map(String::as_str)
    }

    /// Gate an utterance
    #[must_use]
    pub fn check(&self, text: &str) -> GateDecision {
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let Some(hit) = tokens.iter().position(|t| self.is_wake_token(t)) else {
            tracing::trace!(text, "no wake word");
            return GateDecision::NotAddressed;
        };

        let start = if hit > 0 && self.is_carrier(tokens[hit - 1]) {
            hit - 1
        } else {
            hit
        };

        let remainder = tokens[..start]
            .iter()
            .chain(&tokens[hit + 1..])
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let command = remainder
            .trim_start_matches(|c: char| c.is_whitespace() || LEADING_PUNCTUATION.contains(&c))
            .trim();

        tracing::debug!(token = tokens[hit], command, "wake word detected");

        if command.is_empty() {
            GateDecision::MissingCommand
        } else {
            GateDecision::Addressed {
                command: command.to_string(),
            }
        }
    }

    fn is_wake_token(&self, token: &str) -> bool {
        let token = normalize_token(token);
        !token.is_empty()
            && self
                .wake_words
                .iter()
                .any(|w| within_distance(w, &token, self.max_distance))
    }

    fn is_carrier(&self, token: &str) -> bool {
        let token = normalize_token(token);
        self.carriers.contains(&token)
    }
}

/// Lowercase and keep only alphanumerics
fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Edit budget for a wake word: 30% of its length, rounded up
fn max_distance(word: &str) -> usize {
    (word.chars().count() * 3).div_ceil(10)
}

fn within_distance(expected: &str, actual: &str, max_distance: usize) -> bool {
    expected == actual || levenshtein(expected, actual) <= max_distance
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
