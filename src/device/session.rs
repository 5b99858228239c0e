//! Device connection state
//!
//! One [`DeviceSession`] per device context, constructed explicitly and
//! shared by reference. Nothing here is process-global, so independent
//! sessions can run side by side.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use super::gateway::{CommandResult, DeviceGateway};
use super::vocabulary::Command;
use crate::{Error, Result};

/// Last known connection state of the device
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionState {
    /// Base URL of the device (e.g. `http://192.168.1.50`)
    pub address: Option<String>,
    /// Result of the most recent probe against `address`
    pub reachable: bool,
    /// Last `/api/status` body
    pub last_snapshot: Option<Value>,
    /// When the last probe for `address` completed
    pub last_probe_at: Option<DateTime<Utc>>,
}

/// Connection state plus the gateway used to talk to the device
#[derive(Debug, Default)]
pub struct DeviceSession {
    state: RwLock<ConnectionState>,
    gateway: DeviceGateway,
}

impl DeviceSession {
    /// Create a session with no address
    #[must_use]
    pub fn new(gateway: DeviceGateway) -> Self {
        Self {
            state: RwLock::new(ConnectionState::default()),
            gateway,
        }
    }

    /// Create a session seeded with an address (not yet probed)
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be parsed
    pub fn with_address(gateway: DeviceGateway, address: &str) -> Result<Self> {
        let address = normalize_address(address)?;
        Ok(Self {
            state: RwLock::new(ConnectionState {
                address: Some(address),
                ..ConnectionState::default()
            }),
            gateway,
        })
    }

    /// Gateway used by this session
    #[must_use]
    pub const fn gateway(&self) -> &DeviceGateway {
        &self.gateway
    }

    /// Point the session at a new device
    ///
    /// Reachability and snapshot are reset until a fresh probe succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be parsed; state is left untouched
    pub async fn set_address(&self, raw: &str) -> Result<String> {
        let address = normalize_address(raw)?;

        let mut state = self.state.write().await;
        *state = ConnectionState {
            address: Some(address.clone()),
            ..ConnectionState::default()
        };

        tracing::info!(address = %address, "device address set");
        Ok(address)
    }

    /// Forget the device address
    pub async fn clear_address(&self) {
        *self.state.write().await = ConnectionState::default();
        tracing::info!("device address cleared");
    }

    /// Current device address
    pub async fn address(&self) -> Option<String> {
        self.state.read().await.address.clone()
    }

    /// Whether the last probe succeeded
    pub async fn is_reachable(&self) -> bool {
        self.state.read().await.reachable
    }

    /// Last known device state
    pub async fn last_snapshot(&self) -> Option<Value> {
        self.state.read().await.last_snapshot.clone()
    }

    /// Copy of the whole connection state
    pub async fn snapshot(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check that the device answers `/api/status`
    ///
    /// `success` on the returned result is the new reachability. A probe
    /// whose address was replaced while it was in flight does not touch the
    /// new address's state.
    pub async fn probe(&self) -> CommandResult {
        let Some(address) = self.address().await else {
            return CommandResult::not_configured();
        };

        let result = self.gateway.fetch_status(&address).await;

        let mut state = self.state.write().await;
        if state.address.as_deref() != Some(address.as_str()) {
            tracing::debug!(address = %address, "discarding probe for replaced address");
            return result;
        }

        state.reachable = result.success;
        state.last_probe_at = Some(Utc::now());
        if result.success {
            state.last_snapshot.clone_from(&result.data);
        }
        drop(state);

        tracing::info!(address = %address, reachable = result.success, "device probed");
        result
    }

    /// Send a resolved command, gated on reachability
    ///
    /// Without an address or a successful probe nothing is sent.
    pub async fn send_command(&self, command: &Command) -> CommandResult {
        let address = match self.dispatch_address().await {
            Ok(address) => address,
            Err(blocked) => return blocked,
        };

        let result = self.gateway.send_command(&address, command).await;
        if result.success {
            self.refresh_snapshot(&address).await;
        }
        result
    }

    /// Send a raw request, gated on reachability
    pub async fn send_raw(&self, path: &str, method: Method, body: Option<&Value>) -> CommandResult {
        let address = match self.dispatch_address().await {
            Ok(address) => address,
            Err(blocked) => return blocked,
        };

        let result = self.gateway.send_raw(&address, path, method, body).await;
        if result.success {
            self.refresh_snapshot(&address).await;
        }
        result
    }

    async fn dispatch_address(&self) -> std::result::Result<String, CommandResult> {
        let state = self.state.read().await;
        match (&state.address, state.reachable) {
            (None, _) => Err(CommandResult::not_configured()),
            (Some(_), false) => Err(CommandResult::unreachable()),
            (Some(address), true) => Ok(address.clone()),
        }
    }

    /// Best-effort status refresh after a successful command
    async fn refresh_snapshot(&self, address: &str) {
        let status = self.gateway.fetch_status(address).await;
        if !status.success {
            tracing::debug!(message = %status.message, "status refresh failed, keeping old snapshot");
            return;
        }

        let mut state = self.state.write().await;
        if state.address.as_deref() == Some(address) {
            state.last_snapshot = status.data;
            state.last_probe_at = Some(Utc::now());
        }
    }
}

/// Normalize a user-entered device address into a base URL
///
/// Whitespace is removed, `http://` is assumed when no scheme is given and
/// the trailing slash is dropped.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] for empty input, unsupported schemes,
/// missing hosts, or query/fragment parts
pub fn normalize_address(raw: &str) -> Result<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::InvalidAddress("address is empty".to_string()));
    }

    let candidate = if compact.contains("://") {
        compact
    } else {
        format!("http://{compact}")
    };

    let url = Url::parse(&candidate).map_err(|e| Error::InvalidAddress(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidAddress(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidAddress(format!("{raw}: missing host")));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::InvalidAddress(format!(
            "{raw}: query and fragment are not allowed"
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceFailure;

    #[test]
    fn address_normalization() {
        assert_eq!(normalize_address("192.168.1.50").unwrap(), "http://192.168.1.50");
        assert_eq!(normalize_address(" 192.168. 1.50 ").unwrap(), "http://192.168.1.50");
        assert_eq!(
            normalize_address("http://esp32.local:8080/").unwrap(),
            "http://esp32.local:8080"
        );
        assert_eq!(
            normalize_address("https://home.example/device").unwrap(),
            "https://home.example/device"
        );
    }

    #[test]
    fn address_rejections() {
        assert!(matches!(normalize_address("   "), Err(Error::InvalidAddress(_))));
        assert!(matches!(
            normalize_address("ftp://192.168.1.50"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            normalize_address("192.168.1.50/?x=1"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn set_address_resets_reachability() {
        let session = DeviceSession::default();
        {
            let mut state = session.state.write().await;
            state.address = Some("http://10.0.0.1".to_string());
            state.reachable = true;
            state.last_snapshot = Some(serde_json::json!({ "garage": { "open": true } }));
        }

        let address = session.set_address("10.0.0.2").await.unwrap();
        assert_eq!(address, "http://10.0.0.2");

        let state = session.snapshot().await;
        assert_eq!(state.address.as_deref(), Some("http://10.0.0.2"));
        assert!(!state.reachable);
        assert!(state.last_snapshot.is_none());
    }

    #[tokio::test]
    async fn invalid_address_keeps_state() {
        let session = DeviceSession::with_address(DeviceGateway::default(), "10.0.0.1").unwrap();
        assert!(session.set_address("").await.is_err());
        assert_eq!(session.address().await.as_deref(), Some("http://10.0.0.1"));
    }

    #[tokio::test]
    async fn commands_blocked_without_address() {
        let session = DeviceSession::default();
        let result = session.send_command(&Command::new("open", "garage")).await;
        assert!(!result.success);
        assert_eq!(result.failure, Some(DeviceFailure::NotConfigured));

        let probe = session.probe().await;
        assert_eq!(probe.failure, Some(DeviceFailure::NotConfigured));
    }

    #[tokio::test]
    async fn commands_blocked_until_probed() {
        // Port 9 (discard) would fail loudly if a request were ever made
        let session = DeviceSession::with_address(DeviceGateway::default(), "127.0.0.1:9").unwrap();
        let result = session.send_command(&Command::new("on", "room1_led")).await;
        assert_eq!(result.failure, Some(DeviceFailure::Unreachable));

        let raw = session.send_raw("/api/status", Method::GET, None).await;
        assert_eq!(raw.failure, Some(DeviceFailure::Unreachable));
    }

    #[tokio::test]
    async fn clear_address_forgets_everything() {
        let session = DeviceSession::with_address(DeviceGateway::default(), "10.0.0.1").unwrap();
        session.clear_address().await;
        assert_eq!(session.snapshot().await, ConnectionState::default());
    }
}
