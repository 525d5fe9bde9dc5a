/// Integration tests for the LLM client over real HTTP.
///
/// Each test starts a throw-away `tiny_http` server on `127.0.0.1:0` that
/// answers exactly one request with a canned status and body, and hands the
/// captured request back to the test.
use std::sync::mpsc;
use std::thread;

use convopt::llm::prompts::{ANALYSIS_SYSTEM_PROMPT_EN, ANALYSIS_SYSTEM_PROMPT_ZH};
use convopt::llm::{ApiConfiguration, FeatureAnalysisResult, LlmClient, LlmError, PromptLanguage};
use convopt::samples::{ContentSample, Label};
use serde_json::{Value, json};

/// What the mock endpoint saw.
struct Captured {
    authorization: Option<String>,
    body: Value,
}

/// Serve one request, then stop. Returns the endpoint URL and a receiver
/// for the captured request.
fn one_shot_server(status: u16, reply: String) -> (String, mpsc::Receiver<Captured>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok(mut request) = server.recv() else {
            return;
        };
        let authorization = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Authorization"))
            .map(|h| h.value.as_str().to_string());
        let mut raw = String::new();
        let _ = request.as_reader().read_to_string(&mut raw);
        let body = serde_json::from_str(&raw).unwrap_or(Value::Null);

        let _ = tx.send(Captured {
            authorization,
            body,
        });
        let response = tiny_http::Response::from_string(reply).with_status_code(status);
        let _ = request.respond(response);
    });

    (format!("http://{addr}/v1/chat/completions"), rx)
}

/// A chat-completions success body whose first choice carries `content`.
fn completion(content: &str) -> String {
    json!({
        "id": "cmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

fn config(url: &str) -> ApiConfiguration {
    ApiConfiguration {
        endpoint_url: url.to_string(),
        api_key: "sk-test".to_string(),
        model: "test-model".to_string(),
    }
}

fn sample(id: &str, content: &str, label: Label) -> ContentSample {
    ContentSample {
        id: id.to_string(),
        content: content.to_string(),
        label,
        created_at: 1_700_000_000_000,
    }
}

#[test]
fn analysis_round_trip_over_http() {
    let reply = r#"{"highFeatures":["urgency"],"lowFeatures":["vague"],"keyDifferences":["specific numbers"],"recommendations":["add a deadline"]}"#;
    let (url, rx) = one_shot_server(200, completion(reply));
    let client = LlmClient::from_config(&config(&url));

    let high = [sample("1", "Only 3 left, order today", Label::High)];
    let low = [sample("2", "We sell things", Label::Low)];
    let analysis = client.analyze_features(&high, &low).unwrap();

    assert_eq!(
        analysis,
        FeatureAnalysisResult {
            high_features: vec!["urgency".to_string()],
            low_features: vec!["vague".to_string()],
            key_differences: vec!["specific numbers".to_string()],
            recommendations: vec!["add a deadline".to_string()],
        }
    );

    let seen = rx.recv().unwrap();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(seen.body["model"], "test-model");
    assert_eq!(seen.body["stream"], false);
    assert_eq!(seen.body["enable_thinking"], false);
    assert_eq!(seen.body["max_tokens"], 1024);

    let messages = seen.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    let user = messages[1]["content"].as_str().unwrap();
    assert!(user.contains("Only 3 left, order today"));
    assert!(user.contains("We sell things"));
}

#[test]
fn optimization_round_trip_over_http() {
    let reply = "```json\n{\"score\":72,\"strengths\":[\"clear\"],\"weaknesses\":[\"no urgency\"],\"suggestions\":[\"add a deadline\"],\"optimizedVersion\":\"Order today, only 3 left\"}\n```";
    let (url, rx) = one_shot_server(200, completion(reply));
    let client = LlmClient::from_config(&config(&url)).max_tokens(512);

    let analysis = FeatureAnalysisResult {
        high_features: vec!["urgency".to_string()],
        low_features: vec!["vague".to_string()],
        key_differences: vec!["deadlines".to_string()],
        recommendations: vec![],
    };
    let result = client.optimize_content("Buy our stuff", &analysis).unwrap();
    assert_eq!(result.score, 72);
    assert_eq!(result.rating(), "good");
    assert_eq!(result.optimized_version, "Order today, only 3 left");

    let seen = rx.recv().unwrap();
    assert_eq!(seen.body["max_tokens"], 512);
    let user = seen.body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Buy our stuff"));
    assert!(user.contains("urgency"));
}

#[test]
fn prompt_language_selects_the_prompts_sent() {
    let reply = r#"{"highFeatures":[],"lowFeatures":[],"keyDifferences":[],"recommendations":[]}"#;
    let high = [sample("1", "限时抢购", Label::High)];
    let low = [sample("2", "我们卖鞋", Label::Low)];

    let (url, rx) = one_shot_server(200, completion(reply));
    LlmClient::from_config(&config(&url))
        .analyze_features(&high, &low)
        .unwrap();
    let seen = rx.recv().unwrap();
    assert_eq!(seen.body["messages"][0]["content"], ANALYSIS_SYSTEM_PROMPT_ZH);
    let user = seen.body["messages"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("请分析以下文案样本"));

    let (url, rx) = one_shot_server(200, completion(reply));
    LlmClient::from_config(&config(&url))
        .prompt_language(PromptLanguage::English)
        .analyze_features(&high, &low)
        .unwrap();
    let seen = rx.recv().unwrap();
    assert_eq!(seen.body["messages"][0]["content"], ANALYSIS_SYSTEM_PROMPT_EN);
}

#[test]
fn error_status_becomes_transport_error() {
    let (url, _rx) = one_shot_server(401, r#"{"error":"invalid key"}"#.to_string());
    let client = LlmClient::from_config(&config(&url));

    let err = client.invoke("system", "user").unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.kind(), "transport");
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("invalid key"));
}

#[test]
fn non_json_content_is_a_format_error() {
    let (url, _rx) = one_shot_server(200, completion("Sure! Here are some thoughts."));
    let client = LlmClient::from_config(&config(&url));

    let high = [sample("1", "a", Label::High)];
    let low = [sample("2", "b", Label::Low)];
    let err = client.analyze_features(&high, &low).unwrap_err();
    assert!(matches!(err, LlmError::ResponseFormat(_)));
}

#[test]
fn connection_test_sends_minimal_request() {
    let (url, rx) = one_shot_server(200, "{}".to_string());
    let client = LlmClient::from_config(&config(&url));

    client.test_connection().unwrap();

    let seen = rx.recv().unwrap();
    assert_eq!(seen.body["max_tokens"], 10);
    assert!(seen.body.get("enable_thinking").is_none());
    let messages = seen.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Connection test");
}

#[test]
fn unreachable_endpoint_has_no_status() {
    // Bind and drop a listener to get a port nothing is listening on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = LlmClient::from_config(&config(&format!("http://127.0.0.1:{port}/v1")));

    let err = client.invoke("system", "user").unwrap_err();
    assert!(matches!(err, LlmError::Transport { status: None, .. }));
}
