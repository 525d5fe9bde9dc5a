/// API configuration for the chat-completions endpoint.
///
/// This is the user-facing record persisted under the `"apiConfig"` key of
/// the local store (see [`crate::storage`]). It is a plain value: callers load
/// it, pass it by reference into [`super::client::LlmClient::from_config`],
/// and save it back explicitly. The client never looks it up on its own.
///
/// The on-disk field names (`apiUrl`, `apiKey`, `model`) are kept stable so
/// records written by earlier versions of the tool load unchanged.
use serde::{Deserialize, Serialize};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

/// Endpoint, credentials and model for the LLM service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfiguration {
    /// Full URL of the chat-completions endpoint (not a base URL).
    #[serde(rename = "apiUrl")]
    pub endpoint_url: String,
    /// Bearer token. Empty means "not configured".
    #[serde(rename = "apiKey")]
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
}

impl Default for ApiConfiguration {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ApiConfiguration {
    /// Whether an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return String::new();
        }
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{visible}", "*".repeat(chars.len() - 4))
    }

    /// Overwrite the fields that are `Some`, keeping the rest.
    pub fn apply_updates(
        &mut self,
        endpoint_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    ) {
        if let Some(url) = endpoint_url {
            self.endpoint_url = url;
        }
        if let Some(key) = api_key {
            self.api_key = key;
        }
        if let Some(model) = model {
            self.model = model;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
