//! Device command vocabulary
//!
//! The closed set of actuators the device exposes and the REST path each
//! (target, action) pair maps to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Generic control endpoint used when a target has no direct path
pub const CONTROL_PATH: &str = "/api/control";

/// Device status endpoint
pub const STATUS_PATH: &str = "/api/status";

/// Logical actuators on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Garage,
    Window,
    Door,
    GarageLed,
    Room1Led,
    Room2Led,
    Buzzer,
}

impl Target {
    /// Every known target, in prompt order
    pub const ALL: [Self; 7] = [
        Self::Garage,
        Self::Window,
        Self::Door,
        Self::GarageLed,
        Self::Room1Led,
        Self::Room2Led,
        Self::Buzzer,
    ];

    /// Wire name used by the device API and the model
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Garage => "garage",
            Self::Window => "window",
            Self::Door => "door",
            Self::GarageLed => "garage_led",
            Self::Room1Led => "room1_led",
            Self::Room2Led => "room2_led",
            Self::Buzzer => "buzzer",
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Garage => "Garage",
            Self::Window => "Window",
            Self::Door => "Door",
            Self::GarageLed => "Garage LED",
            Self::Room1Led => "Room 1 LED",
            Self::Room2Led => "Room 2 LED",
            Self::Buzzer => "Buzzer",
        }
    }

    /// Actions advertised to the model for this target
    #[must_use]
    pub const fn actions(self) -> &'static [&'static str] {
        match self {
            Self::Garage | Self::Window | Self::Door => &["open", "close"],
            Self::GarageLed | Self::Room1Led | Self::Room2Led => &["on", "off"],
            Self::Buzzer => &["on", "off", "beep"],
        }
    }

    /// Path prefix of the direct control endpoint
    const fn path_prefix(self) -> &'static str {
        match self {
            Self::Garage => "/api/garage",
            Self::Window => "/api/window",
            Self::Door => "/api/door",
            Self::GarageLed => "/api/led/garage",
            Self::Room1Led => "/api/led/room1",
            Self::Room2Led => "/api/led/room2",
            Self::Buzzer => "/api/buzzer",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown target name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTarget(pub String);

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown target: {}", self.0)
    }
}

impl std::error::Error for UnknownTarget {}

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| UnknownTarget(name.to_string()))
    }
}

/// A directive for the device
///
/// `target` stays a raw string: targets added on the device side only must
/// still reach it through the control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: String,
    pub target: String,
}

impl Command {
    /// Create a command
    #[must_use]
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
        }
    }

    /// The target, if it is one of the known actuators
    #[must_use]
    pub fn known_target(&self) -> Option<Target> {
        self.target.parse().ok()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.target)
    }
}

/// Direct endpoint path for a command, if its target is known
///
/// Actions that could escape the path segment yield `None` so the command
/// falls back to the control endpoint.
#[must_use]
pub fn endpoint_for(command: &Command) -> Option<String> {
    let target = command.known_target()?;
    let action = command.action.trim().to_lowercase();

    if action.is_empty()
        || !action
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }

    Some(format!("{}/{action}", target.path_prefix()))
}

/// How a command reaches the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET` on a per-device path
    Direct { path: String },
    /// `POST /api/control` carrying the raw command
    Control { body: Command },
}

impl Route {
    /// Choose the route for a command
    #[must_use]
    pub fn for_command(command: &Command) -> Self {
        endpoint_for(command).map_or_else(
            || Self::Control {
                body: command.clone(),
            },
            |path| Self::Direct { path },
        )
    }

    /// Path the request is sent to
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Direct { path } => path,
            Self::Control { .. } => CONTROL_PATH,
        }
    }
}

/// Device listing embedded in the model instructions
#[must_use]
pub fn vocabulary_listing() -> String {
    Target::ALL
        .iter()
        .map(|t| {
            let actions = t
                .actions()
                .iter()
                .map(|a| format!("\"{a}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!("- {}: {actions} (target: \"{}\")", t.label(), t.as_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_paths() {
        assert_eq!(
            endpoint_for(&Command::new("open", "garage")).as_deref(),
            Some("/api/garage/open")
        );
        assert_eq!(
            endpoint_for(&Command::new("off", "room2_led")).as_deref(),
            Some("/api/led/room2/off")
        );
        assert_eq!(
            endpoint_for(&Command::new("on", "garage_led")).as_deref(),
            Some("/api/led/garage/on")
        );
        assert_eq!(
            endpoint_for(&Command::new("beep", "buzzer")).as_deref(),
            Some("/api/buzzer/beep")
        );
    }

    #[test]
    fn unknown_target_routes_to_control() {
        let cmd = Command::new("on", "attic_fan");
        assert_eq!(endpoint_for(&cmd), None);
        assert_eq!(Route::for_command(&cmd), Route::Control { body: cmd.clone() });
        assert_eq!(Route::for_command(&cmd).path(), CONTROL_PATH);
    }

    #[test]
    fn action_is_normalized() {
        assert_eq!(
            endpoint_for(&Command::new("  Close ", "door")).as_deref(),
            Some("/api/door/close")
        );
    }

    #[test]
    fn suspicious_action_never_becomes_a_path() {
        let cmd = Command::new("../status", "garage");
        assert_eq!(endpoint_for(&cmd), None);
        assert_eq!(Route::for_command(&cmd).path(), CONTROL_PATH);
        assert_eq!(endpoint_for(&Command::new("", "garage")), None);
    }

    #[test]
    fn target_round_trips_through_str() {
        for target in Target::ALL {
            assert_eq!(target.as_str().parse::<Target>(), Ok(target));
        }
        assert!("Garage".parse::<Target>().is_err());
    }

    #[test]
    fn listing_mentions_every_target() {
        let listing = vocabulary_listing();
        for target in Target::ALL {
            assert!(listing.contains(&format!("(target: \"{target}\")")));
        }
        assert!(listing.contains("\"beep\""));
    }
}
