//! HTTP API server for the Sirius gateway

pub mod chat;
pub mod device;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::assistant::Assistant;
use crate::config::DEFAULT_PORT;
use crate::device::DeviceSession;

/// Shared state for API handlers
#[derive(Debug, Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
    pub session: Arc<DeviceSession>,
}

impl ApiState {
    /// State over an assistant and the session it dispatches through
    #[must_use]
    pub fn new(assistant: Arc<Assistant>) -> Self {
        let session = assistant.session().clone();
        Self { assistant, session }
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    assistant: Arc<Assistant>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(assistant: Arc<Assistant>) -> Self {
        Self {
            assistant,
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }

    /// Set the listening port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Serve a static web UI from this directory
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        ApiServer {
            state: Arc::new(ApiState::new(self.assistant)),
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(chat::router(self.state.clone()))
            .merge(device::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from the browser UI
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            model = self.state.assistant.model_name(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// `{ "error": { "code", "message" } }` response
pub(crate) fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    #[derive(Serialize)]
    struct ErrorResponse {
        error: ErrorBody,
    }

    #[derive(Serialize)]
    struct ErrorBody {
        code: &'static str,
        message: String,
    }

    (
        status,
        Json(ErrorResponse {
            error: ErrorBody { code, message },
        }),
    )
        .into_response()
}
