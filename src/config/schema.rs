/// Application settings schema and defaults.
///
/// Defines the TOML-serializable settings with the sections `[server]`,
/// `[storage]`, `[llm]` and `[logging]`. Every field has a built-in default,
/// so users only set what they want to change.
///
/// The API endpoint, key and model are **not** here. They live in the
/// `"apiConfig"` record of the data store and are edited through
/// `convopt api set` or the settings tab of the web page.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::llm::PromptLanguage;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level convopt settings.
///
/// Maps directly to `~/.convopt/config.toml` and `.convopt.toml`. All sections
/// and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvoptConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmSettings,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

/// Embedded web page settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for `convopt serve`.
    pub addr: String,
    /// Open the page in the default browser on start.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [storage]
// ---------------------------------------------------------------------------

/// Where the sample list and API configuration records are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory. Empty means `~/.convopt/data`.
    pub data_dir: String,
}

// ---------------------------------------------------------------------------
// [llm]
// ---------------------------------------------------------------------------

/// Request settings for analysis and optimization calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `max_tokens` for analysis and optimization requests.
    pub max_tokens: u32,
    /// Language of the prompts: `"zh"` or `"en"`.
    pub prompt_language: PromptLanguage,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            max_tokens: crate::llm::client::DEFAULT_MAX_TOKENS,
            prompt_language: PromptLanguage::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append one line per LLM call to `~/.convopt/events.jsonl`.
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

impl ConvoptConfig {
    /// Resolved data directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        let configured = self.storage.data_dir.trim();
        if configured.is_empty() {
            dirs::home_dir().map(|home| home.join(".convopt").join("data"))
        } else {
            Some(PathBuf::from(configured))
        }
    }

    /// The default config as annotated TOML, written by `convopt config init`.
    pub fn default_toml() -> String {
        r#"# convopt configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (CONVOPT_*)
#   2. Project config (.convopt.toml in current directory)
#   3. User global config (~/.convopt/config.toml)
#   4. Built-in defaults
#
# The API endpoint, key and model are stored with your samples.
# Use `convopt api set` or the settings tab of `convopt serve`.

[server]
addr = "127.0.0.1:9747"
open_browser = true

[storage]
data_dir = ""          # empty = ~/.convopt/data

[llm]
max_tokens = 1024
prompt_language = "zh"  # "zh" or "en"

[logging]
enabled = true         # ~/.convopt/events.jsonl
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
