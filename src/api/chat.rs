//! Utterance endpoints: typed chat and browser speech transcripts

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiState, error_response};
use crate::Error;
use crate::assistant::{Channel, Interaction};
use crate::device::CommandResult;
use crate::intent::ResolverOutcome;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/voice/utterance", post(utterance))
        .with_state(state)
}

/// Typed chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Final speech transcript from the browser
#[derive(Debug, Deserialize)]
pub struct UtteranceRequest {
    #[serde(default)]
    pub transcript: String,
}

/// Reply to an addressed utterance
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Correlates the reply with gateway logs
    pub id: Uuid,
    #[serde(flatten)]
    pub outcome: ResolverOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<CommandResult>,
    pub reply: String,
}

async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    handle(&state, &request.message, Channel::Text).await
}

async fn utterance(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UtteranceRequest>,
) -> Result<Response, ChatError> {
    handle(&state, &request.transcript, Channel::Voice).await
}

async fn handle(state: &ApiState, text: &str, channel: Channel) -> Result<Response, ChatError> {
    let id = Uuid::new_v4();
    tracing::debug!(%id, ?channel, "utterance received");

    let interaction = state.assistant.handle_text(text, channel).await?;
    let reply = interaction.reply_text();

    match (interaction, reply) {
        (Interaction::Replied { outcome, device }, Some(reply)) => Ok(Json(ChatResponse {
            id,
            outcome,
            device,
            reply,
        })
        .into_response()),
        _ => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Chat API errors
#[derive(Debug)]
pub enum ChatError {
    InvalidInput(String),
    ModelUnavailable(String),
    ModelTimeout(String),
    Internal(String),
}

impl From<Error> for ChatError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(msg) => Self::InvalidInput(msg),
            Error::ModelTimeout(_) => Self::ModelTimeout(e.to_string()),
            e if e.is_upstream() => Self::ModelUnavailable(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        /// Upstream failures keep the outcome shape so the UI can show them inline
        #[derive(Serialize)]
        struct UpstreamError {
            #[serde(rename = "type")]
            kind: &'static str,
            message: String,
            code: &'static str,
        }

        let upstream = |status: StatusCode, detail: String| {
            tracing::warn!(error = %detail, "language model unavailable");
            (
                status,
                Json(UpstreamError {
                    kind: "error",
                    message: "The assistant is unavailable right now. Please try again."
                        .to_string(),
                    code: "upstream_unavailable",
                }),
            )
                .into_response()
        };

        match self {
            Self::InvalidInput(msg) => error_response(StatusCode::BAD_REQUEST, "invalid_input", msg),
            Self::ModelUnavailable(detail) => upstream(StatusCode::BAD_GATEWAY, detail),
            Self::ModelTimeout(detail) => upstream(StatusCode::GATEWAY_TIMEOUT, detail),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "chat request failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        }
    }
}
