//! JSON API handlers for the web page.
//!
//! Each handler corresponds to an API endpoint and returns an [`ApiReply`]
//! (status + JSON body). Converting replies into HTTP responses is left to
//! the server loop in the parent module, so handlers can be exercised
//! without a socket.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::schema::LlmSettings;
use crate::llm::{ApiConfiguration, LlmClient, LlmError, Transport};
use crate::samples::{Label, LabelCounts, SampleError, SampleManager};
use crate::session::{Session, WorkflowError};
use crate::storage::{self, KeyValueStore};

// ---------------------------------------------------------------------------
// State and replies
// ---------------------------------------------------------------------------

/// Everything the handlers touch. Lives for the lifetime of the server.
#[derive(Debug)]
pub struct AppState<S, T> {
    pub samples: SampleManager<S>,
    pub session: Session,
    pub transport: T,
    pub llm: LlmSettings,
}

/// A client over the currently saved API configuration.
///
/// Borrows only the transport, so the session can be borrowed mutably
/// alongside it.
fn client_for<'a, S: KeyValueStore, T: Transport>(
    samples: &SampleManager<S>,
    transport: &'a T,
    llm: &LlmSettings,
) -> LlmClient<&'a T> {
    let config = storage::load_api_config(samples.store());
    LlmClient::with_transport(&config, transport)
        .max_tokens(llm.max_tokens)
        .prompt_language(llm.prompt_language)
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, kind: &str, message: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string(), "kind": kind }),
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct NewSampleRequest {
    content: String,
    label: Label,
}

/// Partial API configuration update; absent fields are kept.
#[derive(Deserialize)]
struct ConfigUpdateRequest {
    #[serde(rename = "apiUrl")]
    endpoint_url: Option<String>,
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct OptimizeRequest {
    content: String,
}

#[derive(Serialize)]
struct CountsResponse {
    high: usize,
    low: usize,
    total: usize,
}

impl From<LabelCounts> for CountsResponse {
    fn from(counts: LabelCounts) -> Self {
        Self {
            high: counts.high,
            low: counts.low,
            total: counts.total(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_json<T: Serialize>(data: &T) -> Result<Value> {
    serde_json::to_value(data).context("failed to serialize JSON response")
}

/// Parse a request body, turning malformed JSON into a 400 reply.
fn parse_body<'a, B: Deserialize<'a>>(body: &'a str) -> Result<B, ApiReply> {
    serde_json::from_str(body).map_err(|e| ApiReply::error(400, "bad_request", e))
}

/// HTTP status for a workflow failure.
fn workflow_status(err: &WorkflowError) -> u16 {
    match err {
        WorkflowError::MissingSamples { .. }
        | WorkflowError::EmptyContent
        | WorkflowError::NoAnalysis => 400,
        WorkflowError::Llm(e) => llm_status(e),
    }
}

fn llm_status(err: &LlmError) -> u16 {
    match err {
        LlmError::Configuration(_) => 412,
        LlmError::Transport { .. } | LlmError::ResponseFormat(_) => 502,
    }
}

fn workflow_error(err: WorkflowError) -> ApiReply {
    ApiReply::error(workflow_status(&err), err.kind(), &err)
}

fn sample_error(err: SampleError) -> ApiReply {
    match err {
        SampleError::BlankContent => ApiReply::error(400, "blank_content", &err),
        SampleError::NotFound(_) => ApiReply::error(404, "not_found", &err),
    }
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/samples`: all samples plus per-label counts.
pub fn list_samples<S: KeyValueStore, T>(state: &AppState<S, T>) -> Result<ApiReply> {
    Ok(ApiReply::ok(json!({
        "samples": to_json(&state.samples.samples())?,
        "counts": to_json(&CountsResponse::from(state.samples.counts()))?,
    })))
}

/// `POST /api/samples`: add a sample.
///
/// Expects JSON body: `{ "content": "...", "label": "high" | "low" }`
pub fn add_sample<S: KeyValueStore, T>(state: &mut AppState<S, T>, body: &str) -> Result<ApiReply> {
    let req: NewSampleRequest = match parse_body(body) {
        Ok(req) => req,
        Err(reply) => return Ok(reply),
    };

    let sample = match state.samples.add(&req.content, req.label) {
        Ok(sample) => to_json(sample)?,
        Err(e) => return Ok(sample_error(e)),
    };

    Ok(ApiReply {
        status: 201,
        body: json!({
            "sample": sample,
            "counts": to_json(&CountsResponse::from(state.samples.counts()))?,
        }),
    })
}

/// `DELETE /api/samples/{id}`: remove a sample.
pub fn remove_sample<S: KeyValueStore, T>(state: &mut AppState<S, T>, id: &str) -> Result<ApiReply> {
    match state.samples.remove(id) {
        Ok(removed) => Ok(ApiReply::ok(json!({
            "removed": to_json(&removed)?,
            "counts": to_json(&CountsResponse::from(state.samples.counts()))?,
        }))),
        Err(e) => Ok(sample_error(e)),
    }
}

/// `GET /api/config`: the saved API configuration.
pub fn get_config<S: KeyValueStore, T>(state: &AppState<S, T>) -> Result<ApiReply> {
    let config = storage::load_api_config(state.samples.store());
    Ok(ApiReply::ok(to_json(&config)?))
}

/// `PUT /api/config`: update and save the API configuration.
///
/// Expects JSON body with any of `apiUrl`, `apiKey`, `model`.
pub fn put_config<S: KeyValueStore, T>(state: &mut AppState<S, T>, body: &str) -> Result<ApiReply> {
    let req: ConfigUpdateRequest = match parse_body(body) {
        Ok(req) => req,
        Err(reply) => return Ok(reply),
    };

    let mut config: ApiConfiguration = storage::load_api_config(state.samples.store());
    config.apply_updates(req.endpoint_url, req.api_key, req.model);
    storage::save_api_config(state.samples.store_mut(), &config);

    Ok(ApiReply::ok(to_json(&config)?))
}

/// `POST /api/config/test`: send a tiny request with the saved configuration.
pub fn test_config<S: KeyValueStore, T: Transport>(state: &AppState<S, T>) -> Result<ApiReply> {
    let client = client_for(&state.samples, &state.transport, &state.llm);
    match state.session.test_connection(&client) {
        Ok(()) => Ok(ApiReply::ok(json!({ "success": true }))),
        Err(e) => Ok(ApiReply::error(llm_status(&e), e.kind(), &e)),
    }
}

/// `POST /api/analyze`: run a feature analysis over the current samples.
pub fn analyze<S: KeyValueStore, T: Transport>(state: &mut AppState<S, T>) -> Result<ApiReply> {
    let client = client_for(&state.samples, &state.transport, &state.llm);
    match state.session.analyze(&client, state.samples.samples()) {
        Ok(analysis) => Ok(ApiReply::ok(to_json(analysis)?)),
        Err(e) => Ok(workflow_error(e)),
    }
}

/// `GET /api/analysis`: the analysis held in memory, or `null`.
pub fn get_analysis<S, T>(state: &AppState<S, T>) -> Result<ApiReply> {
    Ok(ApiReply::ok(json!({
        "analysis": to_json(&state.session.analysis())?,
    })))
}

/// `POST /api/optimize`: score and rewrite new copy.
///
/// Expects JSON body: `{ "content": "..." }`
pub fn optimize<S: KeyValueStore, T: Transport>(state: &AppState<S, T>, body: &str) -> Result<ApiReply> {
    let req: OptimizeRequest = match parse_body(body) {
        Ok(req) => req,
        Err(reply) => return Ok(reply),
    };

    let client = client_for(&state.samples, &state.transport, &state.llm);
    match state.session.optimize(&client, &req.content) {
        Ok(result) => {
            let mut body = to_json(&result)?;
            body["rating"] = json!(result.rating());
            Ok(ApiReply::ok(body))
        }
        Err(e) => Ok(workflow_error(e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
