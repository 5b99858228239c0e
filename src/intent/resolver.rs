//! Intent resolver: one utterance, one model call, one outcome

use std::sync::Arc;
use std::time::Duration;

use super::normalize::resolve_reply;
use super::prompt::build_prompt;
use super::{LanguageModel, ResolverOutcome};
use crate::{Error, Result};

/// Default deadline for the model call
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns plain-text commands into [`ResolverOutcome`]s
#[derive(Clone)]
pub struct IntentResolver {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl std::fmt::Debug for IntentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentResolver")
            .field("model", &self.model.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl IntentResolver {
    /// Create a resolver over a model
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Provider name of the underlying model
    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Classify a command (wake word already stripped)
    ///
    /// Makes exactly one model call; there is no retry. A reply that cannot
    /// be parsed is not an error: it becomes the fallback conversation.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for empty or whitespace-only text (no call made)
    /// - [`Error::Model`] if the model is unreachable or answers non-2xx
    /// - [`Error::ModelTimeout`] if the model does not answer in time
    pub async fn classify(&self, text: &str) -> Result<ResolverOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("User input is required.".to_string()));
        }

        let prompt = build_prompt(text);

        let reply = tokio::time::timeout(self.timeout, self.model.generate(&prompt))
            .await
            .map_err(|_| Error::ModelTimeout(self.timeout))??;

        tracing::debug!(model = self.model.name(), reply = %reply, "model reply");

        let outcome = resolve_reply(&reply);
        tracing::info!(text, outcome = outcome.kind(), "utterance classified");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::device::Command;

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct CannedModel {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl CannedModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(prompt.contains("User query:"));
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(Error::Model("503 Service Unavailable".to_string())),
                Reply::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    #[tokio::test]
    async fn test_empty_input_never_calls_model() {
        let model = CannedModel::new(Reply::Text("{}"));
        let resolver = IntentResolver::new(model.clone(), DEFAULT_MODEL_TIMEOUT);

        assert!(matches!(resolver.classify("   \n\t").await, Err(Error::InvalidInput(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_action_reply() {
        let model = CannedModel::new(Reply::Text(
            "```json\n{\"type\":\"action\",\"command\":{\"action\":\"open\",\"target\":\"garage\"}}\n```",
        ));
        let resolver = IntentResolver::new(model.clone(), DEFAULT_MODEL_TIMEOUT);

        let outcome = resolver.classify("open the garage").await.unwrap();
        assert_eq!(
            outcome,
            ResolverOutcome::Action {
                command: Command::new("open", "garage")
            }
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_garbage_reply_is_fallback_not_error() {
        let model = CannedModel::new(Reply::Text("Sure thing, opening it now!"));
        let resolver = IntentResolver::new(model, DEFAULT_MODEL_TIMEOUT);

        let outcome = resolver.classify("open the garage").await.unwrap();
        assert_eq!(outcome, ResolverOutcome::fallback());
    }

    #[tokio::test]
    async fn test_transport_failure_is_upstream_error() {
        let model = CannedModel::new(Reply::Fail);
        let resolver = IntentResolver::new(model.clone(), DEFAULT_MODEL_TIMEOUT);

        let err = resolver.classify("open the garage").await.unwrap_err();
        assert!(err.is_upstream());
        assert!(matches!(err, Error::Model(_)));
        // Single attempt, no retry
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let model = CannedModel::new(Reply::Hang);
        let resolver = IntentResolver::new(model, Duration::from_millis(50));

        let err = resolver.classify("open the garage").await.unwrap_err();
        assert!(matches!(err, Error::ModelTimeout(_)));
        assert!(err.is_upstream());
    }
}
