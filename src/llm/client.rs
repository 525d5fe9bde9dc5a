/// Chat-completions HTTP client.
///
/// Talks to any OpenAI-compatible `chat/completions` endpoint using the
/// synchronous `ureq` HTTP client. Every call is a single blocking POST:
/// no retries, no backoff, and no timeout beyond the agent's defaults.
///
/// The HTTP hop sits behind the [`Transport`] trait so the client can be
/// driven by a fake in tests without a network.
use serde::{Deserialize, Serialize};

use super::LlmError;
use super::config::ApiConfiguration;
use super::prompts::PromptLanguage;

/// Default completion budget for analysis and optimization calls.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Completion budget for the connection test.
pub const TEST_MAX_TOKENS: u32 = 10;

/// User message sent by [`LlmClient::test_connection`].
const TEST_MESSAGE: &str = "Connection test";

// ---------------------------------------------------------------------------
// Request / response types for the chat-completions API
// ---------------------------------------------------------------------------

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `POST {endpointUrl}`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    max_tokens: u32,
    /// Sent as `false` for real calls; omitted for the connection test.
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_thinking: Option<bool>,
}

/// Success body. Only `choices[0].message.content` is consumed.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One authenticated JSON POST.
///
/// Implementations return the raw response body on a 2xx status and
/// [`LlmError::Transport`] otherwise.
pub trait Transport {
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &serde_json::Value,
    ) -> Result<String, LlmError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &serde_json::Value,
    ) -> Result<String, LlmError> {
        (**self).post_json(url, bearer_token, body)
    }
}

/// The production transport: a `ureq` agent with default settings.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Transport for UreqTransport {
    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &serde_json::Value,
    ) -> Result<String, LlmError> {
        let result = self
            .agent
            .post(url)
            .set("Authorization", &format!("Bearer {bearer_token}"))
            .set("Content-Type", "application/json")
            .send_json(body);

        match result {
            Ok(resp) => resp.into_string().map_err(|e| LlmError::Transport {
                status: None,
                message: format!("failed to read response body: {e}"),
            }),
            Err(ureq::Error::Status(status, resp)) => {
                let message = resp.into_string().unwrap_or_default();
                Err(LlmError::Transport {
                    status: Some(status),
                    message,
                })
            }
            Err(ureq::Error::Transport(err)) => Err(LlmError::Transport {
                status: None,
                message: err.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous chat-completions client.
///
/// Built from an [`ApiConfiguration`] for a single operation; callers create
/// a fresh client whenever the stored configuration may have changed.
#[derive(Debug)]
pub struct LlmClient<T = UreqTransport> {
    config: ApiConfiguration,
    max_tokens: u32,
    language: PromptLanguage,
    transport: T,
}

impl LlmClient<UreqTransport> {
    /// Build a client over the default HTTP transport.
    pub fn from_config(config: &ApiConfiguration) -> Self {
        Self::with_transport(config, UreqTransport::default())
    }
}

impl<T: Transport> LlmClient<T> {
    /// Build a client over an explicit transport.
    pub fn with_transport(config: &ApiConfiguration, transport: T) -> Self {
        Self {
            config: config.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            language: PromptLanguage::default(),
            transport,
        }
    }

    /// Override the completion budget.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Choose the language of the analysis and optimization prompts.
    pub fn prompt_language(mut self, language: PromptLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn language(&self) -> PromptLanguage {
        self.language
    }

    /// Send one system + one user message and return the reply text verbatim.
    ///
    /// Fails with [`LlmError::Configuration`] before touching the network if
    /// no API key is configured.
    pub fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let messages = [
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ];
        self.complete(&messages, self.max_tokens, Some(false))
    }

    /// Check that the endpoint accepts the configured key and model.
    ///
    /// Sends a tiny single-message request; any 2xx status counts as success
    /// and the reply body is not inspected.
    pub fn test_connection(&self) -> Result<(), LlmError> {
        self.ensure_api_key()?;
        let messages = [ChatMessage::user(TEST_MESSAGE)];
        let body = self.request_body(&messages, TEST_MAX_TOKENS, None)?;
        self.transport
            .post_json(&self.config.endpoint_url, self.config.api_key.trim(), &body)?;
        Ok(())
    }

    /// Return the model name for logging.
    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        enable_thinking: Option<bool>,
    ) -> Result<String, LlmError> {
        self.ensure_api_key()?;
        let body = self.request_body(messages, max_tokens, enable_thinking)?;
        let raw = self
            .transport
            .post_json(&self.config.endpoint_url, self.config.api_key.trim(), &body)?;
        extract_first_content(&raw)
    }

    fn ensure_api_key(&self) -> Result<(), LlmError> {
        if self.config.has_api_key() {
            Ok(())
        } else {
            Err(LlmError::Configuration(
                "no API key configured; save one in the API settings first".to_string(),
            ))
        }
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        enable_thinking: Option<bool>,
    ) -> Result<serde_json::Value, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            max_tokens,
            enable_thinking,
        };
        serde_json::to_value(&request).map_err(|e| LlmError::Transport {
            status: None,
            message: format!("failed to encode request: {e}"),
        })
    }
}

/// Pull `choices[0].message.content` out of a success body.
fn extract_first_content(raw: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| LlmError::ResponseFormat(format!("unexpected completion body: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::ResponseFormat("completion has no message content".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Records every request and replays a canned result.
    struct Recorder {
        reply: Result<String, LlmError>,
        calls: RefCell<Vec<(String, String, serde_json::Value)>>,
    }

    impl Recorder {
        fn replying(reply: Result<String, LlmError>) -> Self {
            Self {
                reply,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Recorder {
        fn post_json(
            &self,
            url: &str,
            bearer_token: &str,
            body: &serde_json::Value,
        ) -> Result<String, LlmError> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), bearer_token.to_string(), body.clone()));
            self.reply.clone()
        }
    }

    fn configured() -> ApiConfiguration {
        ApiConfiguration {
            endpoint_url: "http://llm.local/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
        }
    }

    fn completion(content: &str) -> String {
        serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
            .to_string()
    }

    #[test]
    fn invoke_builds_two_message_request() {
        let transport = Recorder::replying(Ok(completion("hello")));
        let client = LlmClient::with_transport(&configured(), &transport);

        let reply = client.invoke("be brief", "say hi").unwrap();
        assert_eq!(reply, "hello");

        let calls = transport.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (url, token, body) = &calls[0];
        assert_eq!(url, "http://llm.local/v1/chat/completions");
        assert_eq!(token, "sk-test");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["enable_thinking"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "say hi");
    }

    #[test]
    fn invoke_without_key_makes_no_request() {
        let transport = Recorder::replying(Ok(completion("unused")));
        let config = ApiConfiguration::default();
        let client = LlmClient::with_transport(&config, &transport);

        let err = client.invoke("s", "u").unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
        assert!(transport.calls.borrow().is_empty());
    }

    #[test]
    fn invoke_returns_content_verbatim() {
        let transport = Recorder::replying(Ok(completion("  padded \n")));
        let client = LlmClient::with_transport(&configured(), &transport);
        assert_eq!(client.invoke("s", "u").unwrap(), "  padded \n");
    }

    #[test]
    fn invoke_propagates_status_errors() {
        let transport = Recorder::replying(Err(LlmError::Transport {
            status: Some(500),
            message: "boom".to_string(),
        }));
        let client = LlmClient::with_transport(&configured(), &transport);
        let err = client.invoke("s", "u").unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn empty_choices_is_a_format_error() {
        let transport = Recorder::replying(Ok(r#"{"choices":[]}"#.to_string()));
        let client = LlmClient::with_transport(&configured(), &transport);
        let err = client.invoke("s", "u").unwrap_err();
        assert!(matches!(err, LlmError::ResponseFormat(_)));
    }

    #[test]
    fn max_tokens_override_is_sent() {
        let transport = Recorder::replying(Ok(completion("ok")));
        let client = LlmClient::with_transport(&configured(), &transport).max_tokens(256);
        client.invoke("s", "u").unwrap();
        assert_eq!(transport.calls.borrow()[0].2["max_tokens"], 256);
    }

    #[test]
    fn connection_test_sends_single_user_message() {
        let transport = Recorder::replying(Ok("not even json".to_string()));
        let client = LlmClient::with_transport(&configured(), &transport);
        client.test_connection().unwrap();

        let calls = transport.calls.borrow();
        let body = &calls[0].2;
        assert_eq!(body["max_tokens"], 10);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("enable_thinking").is_none());
    }

    #[test]
    fn connection_test_requires_key() {
        let transport = Recorder::replying(Ok(String::new()));
        let client = LlmClient::with_transport(&ApiConfiguration::default(), &transport);
        assert!(matches!(
            client.test_connection(),
            Err(LlmError::Configuration(_))
        ));
        assert!(transport.calls.borrow().is_empty());
    }
}
