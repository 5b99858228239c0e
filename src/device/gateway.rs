//! HTTP client for the device REST API
//!
//! Every call carries its own deadline. On expiry the in-flight request
//! future is dropped, which aborts the connection, and the caller gets a
//! [`DeviceFailure::Timeout`] instead of a hung operation.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::vocabulary::{CONTROL_PATH, Command, Route, STATUS_PATH};

/// Default deadline for status / reachability probes
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for action commands
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-call deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTimeouts {
    /// Status probes (shorter)
    pub status: Duration,
    /// Action commands
    pub command: Duration,
}

impl Default for DeviceTimeouts {
    fn default() -> Self {
        Self {
            status: DEFAULT_STATUS_TIMEOUT,
            command: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Why a device call did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceFailure {
    /// No device address configured
    NotConfigured,
    /// Last probe failed or never ran; nothing was sent
    Unreachable,
    /// Sent, but no response before the deadline
    Timeout,
    /// Device answered with a non-success status
    Rejected { status: u16 },
    /// Connection refused, DNS failure, broken response
    Transport,
}

/// Outcome of a device call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<DeviceFailure>,
}

impl CommandResult {
    /// Successful call
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            failure: None,
        }
    }

    /// Successful local operation with no device payload
    #[must_use]
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            failure: None,
        }
    }

    /// Failed call
    #[must_use]
    pub fn failed(failure: DeviceFailure, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            failure: Some(failure),
        }
    }

    /// No address configured
    #[must_use]
    pub fn not_configured() -> Self {
        Self::failed(DeviceFailure::NotConfigured, "Device address not configured.")
    }

    /// Device not known to be reachable
    #[must_use]
    pub fn unreachable() -> Self {
        Self::failed(
            DeviceFailure::Unreachable,
            "Device is not connected. Test the connection first.",
        )
    }

    #[must_use]
    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// What a call is for; only affects deadlines and wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Probe,
    Command,
}

/// Client for the device REST surface
#[derive(Debug, Clone)]
pub struct DeviceGateway {
    client: Client,
    timeouts: DeviceTimeouts,
}

impl Default for DeviceGateway {
    fn default() -> Self {
        Self::new(DeviceTimeouts::default())
    }
}

impl DeviceGateway {
    /// Create a gateway with the given deadlines
    #[must_use]
    pub fn new(timeouts: DeviceTimeouts) -> Self {
        Self {
            client: Client::new(),
            timeouts,
        }
    }

    /// Configured deadlines
    #[must_use]
    pub const fn timeouts(&self) -> DeviceTimeouts {
        self.timeouts
    }

    /// Send a resolved command
    ///
    /// Known targets use their direct path; anything else is posted to the
    /// generic control endpoint with the raw command as body.
    pub async fn send_command(&self, base_url: &str, command: &Command) -> CommandResult {
        match Route::for_command(command) {
            Route::Direct { path } => self.send_raw(base_url, &path, Method::GET, None).await,
            Route::Control { body } => {
                let body = json!({ "action": body.action, "target": body.target });
                self.send_raw(base_url, CONTROL_PATH, Method::POST, Some(&body))
                    .await
            }
        }
    }

    /// Send an arbitrary request to the device
    ///
    /// The body is only attached for non-`GET` methods.
    pub async fn send_raw(
        &self,
        base_url: &str,
        path: &str,
        method: Method,
        body: Option<&Value>,
    ) -> CommandResult {
        self.call(base_url, path, method, body, Purpose::Command).await
    }

    /// Fetch the device state snapshot with the short probe deadline
    pub async fn fetch_status(&self, base_url: &str) -> CommandResult {
        self.call(base_url, STATUS_PATH, Method::GET, None, Purpose::Probe)
            .await
    }

    async fn call(
        &self,
        base_url: &str,
        path: &str,
        method: Method,
        body: Option<&Value>,
        purpose: Purpose,
    ) -> CommandResult {
        let url = join_url(base_url, path);
        let deadline = match purpose {
            Purpose::Probe => self.timeouts.status,
            Purpose::Command => self.timeouts.command,
        };

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if method != Method::GET {
            if let Some(body) = body {
                request = request.json(body);
            }
        }

        tracing::debug!(%method, %url, body = ?body, "device request");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };

        match tokio::time::timeout(deadline, exchange).await {
            Err(_) => {
                tracing::warn!(%url, ?deadline, "device request timed out");
                timeout_result(purpose)
            }
            Ok(Err(e)) => {
                tracing::warn!(%url, error = %e, "device request failed");
                transport_result(&e, purpose)
            }
            Ok(Ok((status, bytes))) => {
                let data: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));
                tracing::debug!(%url, %status, "device response");
                response_result(status, data, purpose)
            }
        }
    }
}

/// Join a base URL and an absolute path without doubling slashes
fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn body_message(data: &Value) -> Option<String> {
    data.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(ToString::to_string)
}

fn response_result(status: StatusCode, data: Value, purpose: Purpose) -> CommandResult {
    if status.is_success() {
        let message = match purpose {
            Purpose::Probe => "Connected to device successfully".to_string(),
            Purpose::Command => {
                body_message(&data).unwrap_or_else(|| "Command executed successfully".to_string())
            }
        };
        return CommandResult::ok(message, data);
    }

    let message = match purpose {
        Purpose::Probe => format!("Failed to connect to device (status: {})", status.as_u16()),
        Purpose::Command => body_message(&data).unwrap_or_else(|| {
            format!("Device returned an error (status: {})", status.as_u16())
        }),
    };

    CommandResult::failed(
        DeviceFailure::Rejected {
            status: status.as_u16(),
        },
        message,
    )
    .with_data(data)
}

fn timeout_result(purpose: Purpose) -> CommandResult {
    let message = match purpose {
        Purpose::Probe => "Connection timeout. Device may be offline.",
        Purpose::Command => "Command timeout. Device may be busy or offline.",
    };
    CommandResult::failed(DeviceFailure::Timeout, message)
}

fn transport_result(error: &reqwest::Error, purpose: Purpose) -> CommandResult {
    if error.is_timeout() {
        return timeout_result(purpose);
    }

    let message = if error.is_connect() {
        "Could not connect to device. Check the address and that it is online."
    } else if error.is_builder() {
        "Device address is not a valid URL."
    } else {
        match purpose {
            Purpose::Probe => "Could not reach device. Check address and network.",
            Purpose::Command => "Error communicating with device.",
        }
    };
    CommandResult::failed(DeviceFailure::Transport, message)
}
