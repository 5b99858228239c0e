//! Shared test utilities
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use sirius_gateway::device::DeviceTimeouts;
use sirius_gateway::{
    Assistant, DeviceGateway, DeviceSession, Error, IntentResolver, LanguageModel, Result,
    WakeWordGate,
};

/// One request seen by the fake device
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// How the fake device behaves
#[derive(Debug, Clone)]
pub struct Behavior {
    pub status_delay: Duration,
    pub command_delay: Duration,
    pub command_status: StatusCode,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status_delay: Duration::ZERO,
            command_delay: Duration::ZERO,
            command_status: StatusCode::OK,
        }
    }
}

struct DeviceState {
    behavior: Behavior,
    seen: Mutex<Vec<Seen>>,
}

/// An ESP32 stand-in bound to an ephemeral local port
pub struct FakeDevice {
    addr: SocketAddr,
    state: Arc<DeviceState>,
}

impl FakeDevice {
    /// Start a device that answers everything promptly
    pub async fn start() -> Self {
        Self::with_behavior(Behavior::default()).await
    }

    /// Start a device with custom delays and status codes
    pub async fn with_behavior(behavior: Behavior) -> Self {
        let state = Arc::new(DeviceState {
            behavior,
            seen: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake device");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake device server");
        });

        Self { addr, state }
    }

    /// Base URL of the device
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Address the way a user would type it
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Requests received so far
    pub fn seen(&self) -> Vec<Seen> {
        self.state.seen.lock().expect("seen lock").clone()
    }

    /// Requests received so far, excluding status polls
    pub fn commands(&self) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.path != "/api/status")
            .collect()
    }
}

/// Device status body
pub fn status_body() -> Value {
    json!({
        "garage": { "open": false },
        "window": { "open": true },
        "door": { "open": false },
        "leds": { "garage": true, "room1": false, "room2": false }
    })
}

async fn handle(
    State(state): State<Arc<DeviceState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let body = serde_json::from_slice::<Value>(&body).ok();
    state.seen.lock().expect("seen lock").push(Seen {
        method,
        path: path.clone(),
        body,
    });

    if path == "/api/status" {
        tokio::time::sleep(state.behavior.status_delay).await;
        return Json(status_body()).into_response();
    }

    tokio::time::sleep(state.behavior.command_delay).await;
    let status = state.behavior.command_status;
    let body = if status.is_success() {
        json!({ "success": true, "message": format!("done {path}") })
    } else {
        json!({ "success": false, "message": format!("refused {path}") })
    };
    (status, Json(body)).into_response()
}

/// What the canned model does when asked
pub enum Reply {
    Text(String),
    Fail,
    Hang,
}

/// A language model with a fixed answer
pub struct CannedModel {
    reply: Reply,
    calls: AtomicUsize,
}

impl CannedModel {
    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Reply::Fail)
    }

    pub fn hanging() -> Arc<Self> {
        Self::new(Reply::Hang)
    }

    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail => Err(Error::Model("connection refused".to_string())),
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

/// Model reply for an action
pub fn action_reply(action: &str, target: &str) -> String {
    json!({ "type": "action", "command": { "action": action, "target": target } }).to_string()
}

/// Short deadlines so timeout tests stay fast
pub fn quick_timeouts() -> DeviceTimeouts {
    DeviceTimeouts {
        status: Duration::from_millis(300),
        command: Duration::from_millis(300),
    }
}

/// Session with no address and default deadlines
pub fn empty_session() -> Arc<DeviceSession> {
    Arc::new(DeviceSession::new(DeviceGateway::new(quick_timeouts())))
}

/// Session pointed at a device and already probed
pub async fn probed_session(device: &FakeDevice) -> Arc<DeviceSession> {
    let session = DeviceSession::with_address(DeviceGateway::new(quick_timeouts()), &device.address())
        .expect("valid address");
    let result = session.probe().await;
    assert!(result.success, "probe failed: {}", result.message);
    Arc::new(session)
}

/// Assistant over a canned model and a session
pub fn assistant(model: Arc<CannedModel>, session: Arc<DeviceSession>) -> Arc<Assistant> {
    let resolver = IntentResolver::new(model, Duration::from_millis(300));
    Arc::new(Assistant::new(WakeWordGate::default(), resolver, session))
}
