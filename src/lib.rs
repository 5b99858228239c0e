//! Sirius Gateway - Voice and text command gateway for home automation
//!
//! This library provides the core functionality for the Sirius gateway:
//! - Wake word gating for speech transcripts and typed chat
//! - Intent resolution through a hosted language model
//! - Device control over the ESP32 REST API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │   Browser chat  │  Browser speech  │  CLI (ask)     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Sirius Gateway                       │
//! │   Wake Word  │  Intent Resolver  │  Device Session  │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐     ┌────────────▼────────────┐
//! │  Language model     │     │  ESP32 device           │
//! │  Gemini │ OpenAI    │     │  /api/status  /api/...  │
//! └─────────────────────┘     └─────────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod config;
pub mod device;
pub mod error;
pub mod intent;
pub mod wake_word;

pub use assistant::{Assistant, Channel, Interaction};
pub use config::Config;
pub use device::{Command, CommandResult, DeviceGateway, DeviceSession, Target};
pub use error::{Error, Result};
pub use intent::{IntentResolver, LanguageModel, ResolverOutcome};
pub use wake_word::{GateDecision, WakeWordGate};
