//! TOML configuration file loading
//!
//! Supports `~/.config/sirius/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SiriusConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Device configuration
    #[serde(default)]
    pub device: DeviceFileConfig,

    /// Wake-word configuration
    #[serde(default)]
    pub wake_word: WakeWordFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Static UI directory served at `/`
    pub static_dir: Option<String>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Provider ("gemini" or "openai")
    pub provider: Option<String>,

    /// Model identifier (e.g. "gemini-1.5-flash")
    pub model: Option<String>,

    /// Override for the provider base URL
    pub base_url: Option<String>,

    /// API key (environment variables take precedence)
    pub api_key: Option<String>,

    /// Model call deadline in seconds
    pub timeout_secs: Option<u64>,
}

/// Device configuration
#[derive(Debug, Default, Deserialize)]
pub struct DeviceFileConfig {
    /// Device address seeded into the session at startup
    pub address: Option<String>,

    /// Status probe deadline in milliseconds
    pub status_timeout_ms: Option<u64>,

    /// Command deadline in milliseconds
    pub command_timeout_ms: Option<u64>,
}

/// Wake-word configuration
#[derive(Debug, Default, Deserialize)]
pub struct WakeWordFileConfig {
    /// Accepted spellings of the wake word
    pub words: Option<Vec<String>>,

    /// Filler words that may precede the wake word ("hey", "ok")
    pub carriers: Option<Vec<String>>,

    /// Require the wake word on the text entry point too
    pub gate_text: Option<bool>,
}

impl SiriusConfigFile {
    /// Parse a config file from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid TOML
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Load the TOML config file from the standard path
///
/// Returns `SiriusConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> SiriusConfigFile {
    let Some(path) = config_file_path() else {
        return SiriusConfigFile::default();
    };

    if !path.exists() {
        return SiriusConfigFile::default();
    }

    match SiriusConfigFile::from_path(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            SiriusConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/sirius/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("sirius").join("config.toml"))
}
