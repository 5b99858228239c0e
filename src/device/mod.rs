//! Home-automation device access
//!
//! - [`vocabulary`]: targets, commands and their REST paths
//! - [`gateway`]: HTTP calls with deadlines and failure classification
//! - [`session`]: address and reachability state gating the gateway

pub mod gateway;
pub mod session;
pub mod vocabulary;

pub use gateway::{CommandResult, DeviceFailure, DeviceGateway, DeviceTimeouts};
pub use session::{ConnectionState, DeviceSession, normalize_address};
pub use vocabulary::{Command, Route, Target, endpoint_for};
