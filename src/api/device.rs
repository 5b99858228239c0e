//! Device configuration and control endpoints
//!
//! `POST /api/device` takes one request shape tagged by `action`, the way
//! the browser UI drives the device; `GET /api/device` reports the address.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiState, error_response};
use crate::device::{Command, CommandResult, ConnectionState, DeviceFailure};

/// Build device router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/device", get(get_address).post(device_action))
        .with_state(state)
}

/// Device request, tagged by `action`
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum DeviceRequest {
    /// Point the gateway at a device
    SetAddress { address: String },
    /// Check the device answers its status endpoint
    Probe,
    /// Send a resolved command or a raw request
    SendCommand {
        #[serde(default)]
        command: Option<Command>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
    /// Report the configured address
    GetAddress,
    /// Forget the device
    ClearAddress,
    /// Last known device status, without a network call
    Status,
}

/// Response to a device request
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    #[serde(flatten)]
    pub result: CommandResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionState>,
}

impl From<CommandResult> for DeviceResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            result,
            address: None,
            connection: None,
        }
    }
}

/// Address report
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub address: Option<String>,
    pub reachable: bool,
}

async fn get_address(State(state): State<Arc<ApiState>>) -> Json<AddressResponse> {
    let snapshot = state.session.snapshot().await;
    Json(AddressResponse {
        address: snapshot.address,
        reachable: snapshot.reachable,
    })
}

async fn device_action(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<DeviceRequest>,
) -> Result<Json<DeviceResponse>, DeviceError> {
    let session = &state.session;

    let response = match request {
        DeviceRequest::SetAddress { address } => {
            let address = session
                .set_address(&address)
                .await
                .map_err(|e| DeviceError::InvalidAddress(e.to_string()))?;
            DeviceResponse {
                address: Some(address),
                ..CommandResult::acknowledged("Device address set.").into()
            }
        }
        DeviceRequest::Probe => {
            let result = session.probe().await;
            DeviceResponse {
                connection: Some(session.snapshot().await),
                ..result.into()
            }
        }
        DeviceRequest::SendCommand {
            command,
            endpoint,
            method,
            data,
        } => send_command(&state, command, endpoint, method, data).await?.into(),
        DeviceRequest::GetAddress => {
            let address = session.address().await;
            let message = if address.is_some() {
                "Device address configured."
            } else {
                "Device address not configured."
            };
            DeviceResponse {
                address,
                ..CommandResult::acknowledged(message).into()
            }
        }
        DeviceRequest::ClearAddress => {
            session.clear_address().await;
            CommandResult::acknowledged("Device address cleared.").into()
        }
        DeviceRequest::Status => {
            let connection = session.snapshot().await;
            let result = match (&connection.address, &connection.last_snapshot) {
                (None, _) => CommandResult::not_configured(),
                (Some(_), Some(snapshot)) => CommandResult::ok("Last known status.", snapshot.clone()),
                (Some(_), None) => CommandResult::failed(
                    DeviceFailure::Unreachable,
                    "No status available. Test the connection first.",
                ),
            };
            DeviceResponse {
                connection: Some(connection),
                ..result.into()
            }
        }
    };

    Ok(Json(response))
}

async fn send_command(
    state: &ApiState,
    command: Option<Command>,
    endpoint: Option<String>,
    method: Option<String>,
    data: Option<Value>,
) -> Result<CommandResult, DeviceError> {
    if let Some(command) = command {
        return Ok(state.session.send_command(&command).await);
    }

    let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) else {
        return Err(DeviceError::BadRequest(
            "sendCommand requires an endpoint or a command".to_string(),
        ));
    };
    let endpoint = endpoint.trim();
    if !endpoint.starts_with('/') {
        return Err(DeviceError::BadRequest(format!(
            "endpoint must start with '/': {endpoint}"
        )));
    }

    let method = match method.as_deref().map(str::trim) {
        None | Some("") => Method::GET,
        Some(raw) => Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map_err(|_| DeviceError::BadRequest(format!("invalid method: {raw}")))?,
    };

    Ok(state.session.send_raw(endpoint, method, data.as_ref()).await)
}

/// Device API errors
#[derive(Debug)]
pub enum DeviceError {
    InvalidAddress(String),
    BadRequest(String),
}

impl IntoResponse for DeviceError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidAddress(msg) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_address", msg)
            }
            Self::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, "bad_request", msg),
        }
    }
}
