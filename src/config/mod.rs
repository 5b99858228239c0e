//! Configuration management for the Sirius gateway
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! environment variables. CLI flags are applied by the binary afterwards.

pub mod file;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::device::DeviceTimeouts;
use crate::intent::DEFAULT_MODEL_TIMEOUT;
use crate::wake_word::{DEFAULT_CARRIERS, DEFAULT_WAKE_WORDS, WakeWordGate};
use crate::{Error, Result};

use self::file::SiriusConfigFile;

/// Default API server port
pub const DEFAULT_PORT: u16 = 18790;

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default OpenAI-compatible model
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Sirius gateway configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Device configuration
    pub device: DeviceConfig,

    /// Wake-word configuration
    pub wake_word: WakeWordConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

/// Hosted language model provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LlmProvider {
    /// Google Gemini
    #[default]
    Gemini,
    /// `OpenAI` or any compatible endpoint
    OpenAi,
}

impl LlmProvider {
    /// Environment variable holding this provider's API key
    #[must_use]
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when none is configured
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        })
    }
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!(
                "unknown LLM provider '{other}' (expected gemini or openai)"
            ))),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider
    pub provider: LlmProvider,

    /// Model identifier
    pub model: String,

    /// Override for the provider base URL
    pub base_url: Option<String>,

    /// API key
    pub api_key: Option<SecretString>,

    /// Model call deadline
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: None,
            api_key: None,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

/// Device configuration
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Address seeded into the session at startup
    pub address: Option<String>,

    /// Status and command deadlines
    pub timeouts: DeviceTimeouts,
}

/// Wake-word configuration
#[derive(Debug, Clone)]
pub struct WakeWordConfig {
    /// Accepted spellings
    pub words: Vec<String>,

    /// Filler words that may precede the wake word
    pub carriers: Vec<String>,

    /// Require the wake word on the text entry point too
    pub gate_text: bool,
}

impl Default for WakeWordConfig {
    fn default() -> Self {
        Self {
            words: DEFAULT_WAKE_WORDS.iter().map(ToString::to_string).collect(),
            carriers: DEFAULT_CARRIERS.iter().map(ToString::to_string).collect(),
            gate_text: true,
        }
    }
}

impl WakeWordConfig {
    /// Build the gate described by this configuration
    #[must_use]
    pub fn gate(&self) -> WakeWordGate {
        WakeWordGate::new(self.words.clone(), self.carriers.clone())
    }
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid (unknown provider,
    /// unparseable port)
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Assemble configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid
    pub fn from_sources(
        fc: SiriusConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        // Server (env > toml > default)
        let port = match env("SIRIUS_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid SIRIUS_PORT '{raw}'")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };
        let server = ServerConfig {
            port,
            static_dir: env("SIRIUS_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        // LLM (env > toml > default)
        let provider = env("SIRIUS_LLM_PROVIDER")
            .or(fc.llm.provider)
            .map(|p| p.parse::<LlmProvider>())
            .transpose()?
            .unwrap_or_default();
        let llm = LlmConfig {
            provider,
            model: env("SIRIUS_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| provider.default_model().to_string()),
            base_url: env("SIRIUS_LLM_BASE_URL").or(fc.llm.base_url),
            api_key: env(provider.api_key_env())
                .or(fc.llm.api_key)
                .map(SecretString::from),
            timeout: fc
                .llm
                .timeout_secs
                .map_or(DEFAULT_MODEL_TIMEOUT, Duration::from_secs),
        };

        // Device (env > toml > default)
        let defaults = DeviceTimeouts::default();
        let device = DeviceConfig {
            address: env("SIRIUS_DEVICE_ADDRESS").or(fc.device.address),
            timeouts: DeviceTimeouts {
                status: fc
                    .device
                    .status_timeout_ms
                    .map_or(defaults.status, Duration::from_millis),
                command: fc
                    .device
                    .command_timeout_ms
                    .map_or(defaults.command, Duration::from_millis),
            },
        };

        // Wake word (env > toml > default)
        let wake_defaults = WakeWordConfig::default();
        let gate_text = env("SIRIUS_GATE_TEXT")
            .map(|v| parse_bool(&v))
            .or(fc.wake_word.gate_text)
            .unwrap_or(wake_defaults.gate_text);
        let wake_word = WakeWordConfig {
            words: fc
                .wake_word
                .words
                .filter(|w| !w.is_empty())
                .unwrap_or(wake_defaults.words),
            carriers: fc.wake_word.carriers.unwrap_or(wake_defaults.carriers),
            gate_text,
        };

        Ok(Self {
            server,
            llm,
            device,
            wake_word,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::config::file::{DeviceFileConfig, LlmFileConfig, ServerFileConfig};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(SiriusConfigFile::default(), lookup(&[])).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.device.timeouts.status, Duration::from_secs(5));
        assert_eq!(config.device.timeouts.command, Duration::from_secs(10));
        assert!(config.wake_word.gate_text);
        assert!(config.wake_word.words.contains(&"sirius".to_string()));
    }

    #[test]
    fn env_overrides_file() {
        let fc = SiriusConfigFile {
            server: ServerFileConfig {
                port: Some(9000),
                static_dir: None,
            },
            device: DeviceFileConfig {
                address: Some("10.0.0.2".to_string()),
                status_timeout_ms: Some(1500),
                command_timeout_ms: None,
            },
            ..SiriusConfigFile::default()
        };
        let env = lookup(&[
            ("SIRIUS_PORT", "9100"),
            ("SIRIUS_DEVICE_ADDRESS", "192.168.4.1"),
            ("GEMINI_API_KEY", "g-key"),
            ("SIRIUS_GATE_TEXT", "false"),
        ]);

        let config = Config::from_sources(fc, env).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.device.address.as_deref(), Some("192.168.4.1"));
        assert_eq!(config.device.timeouts.status, Duration::from_millis(1500));
        assert_eq!(config.device.timeouts.command, Duration::from_secs(10));
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret()),
            Some("g-key")
        );
        assert!(!config.wake_word.gate_text);
    }

    #[test]
    fn openai_provider_uses_its_own_key_and_model() {
        let fc = SiriusConfigFile {
            llm: LlmFileConfig {
                provider: Some("openai".to_string()),
                ..LlmFileConfig::default()
            },
            ..SiriusConfigFile::default()
        };
        let env = lookup(&[("GEMINI_API_KEY", "g-key"), ("OPENAI_API_KEY", "sk-key")]);

        let config = Config::from_sources(fc, env).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-key")
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = Config::from_sources(
            SiriusConfigFile::default(),
            lookup(&[("SIRIUS_LLM_PROVIDER", "claude")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_sources(
            SiriusConfigFile::default(),
            lookup(&[("SIRIUS_PORT", "not-a-port")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let fc = SiriusConfigFile {
            device: DeviceFileConfig {
                address: Some("10.0.0.2".to_string()),
                ..DeviceFileConfig::default()
            },
            ..SiriusConfigFile::default()
        };
        let config =
            Config::from_sources(fc, lookup(&[("SIRIUS_DEVICE_ADDRESS", "  ")])).unwrap();
        assert_eq!(config.device.address.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn provider_parsing() {
        assert_eq!("Gemini".parse::<LlmProvider>().unwrap(), LlmProvider::Gemini);
        assert_eq!(" openai ".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::OpenAi.to_string(), "openai");
    }
}
