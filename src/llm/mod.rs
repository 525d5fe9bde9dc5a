/// LLM layer: prompt building, the chat-completions client, and the
/// response contract for the two operations the tool offers.
///
/// # Operations
///
/// 1. **Feature analysis** ([`LlmClient::analyze_features`]): compares the
///    high-converting and low-converting samples and returns the traits that
///    distinguish them.
/// 2. **Optimization** ([`LlmClient::optimize_content`]): scores a new piece
///    of copy against an existing analysis and proposes an improved version.
///
/// Both are one [`LlmClient::invoke`] call followed by strict schema
/// validation of the reply (see [`validation`]). Nothing is cached: identical
/// inputs always trigger a fresh request.
///
/// # Errors
///
/// Every failure is one of the three [`LlmError`] kinds. None of them is
/// retried automatically; the user re-initiates the operation.
use serde::{Deserialize, Serialize};

pub mod client;
pub mod config;
pub mod prompts;
pub mod validation;

pub use client::{LlmClient, Transport, UreqTransport};
pub use config::ApiConfiguration;
pub use prompts::PromptLanguage;

use crate::samples::ContentSample;
use prompts::{build_analysis_messages, build_optimization_messages};
use validation::{parse_feature_analysis, parse_optimization};

/// Traits the model attributes to each conversion tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAnalysisResult {
    pub high_features: Vec<String>,
    pub low_features: Vec<String>,
    pub key_differences: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Score and rewrite for one candidate piece of copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    /// Estimated conversion potential, `0..=100`.
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub optimized_version: String,
}

impl OptimizationResult {
    /// Rubric band for the score.
    pub fn rating(&self) -> &'static str {
        match self.score {
            80..=100 => "excellent",
            60..=79 => "good",
            40..=59 => "fair",
            _ => "poor",
        }
    }
}

/// Failures of the LLM layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// No usable configuration; no request was attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-2xx status (with its code) or a network failure (without).
    #[error("{}", transport_message(*status, message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The reply could not be turned into the expected shape.
    #[error("malformed model reply, please retry: {0}")]
    ResponseFormat(String),
}

impl LlmError {
    /// HTTP status carried by a transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Stable machine-readable name, used in logs and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transport { .. } => "transport",
            Self::ResponseFormat(_) => "response_format",
        }
    }
}

fn transport_message(status: Option<u16>, message: &str) -> String {
    match (status, message.trim()) {
        (Some(code), "") => format!("API request failed with status {code}"),
        (Some(code), body) => format!("API request failed with status {code}: {body}"),
        (None, detail) => format!("API request failed: {detail}"),
    }
}

impl<T: Transport> LlmClient<T> {
    /// Ask the model which traits separate high- from low-converting copy.
    ///
    /// Both lists are expected to be non-empty; that guard belongs to the
    /// caller (see [`crate::session::Session::analyze`]).
    pub fn analyze_features(
        &self,
        high_samples: &[ContentSample],
        low_samples: &[ContentSample],
    ) -> Result<FeatureAnalysisResult, LlmError> {
        let (system, user) =
            build_analysis_messages(self.language(), high_samples, low_samples);
        let reply = self.invoke(&system, &user)?;
        parse_feature_analysis(&reply)
    }

    /// Score and rewrite `content` against a previous analysis.
    pub fn optimize_content(
        &self,
        content: &str,
        analysis: &FeatureAnalysisResult,
    ) -> Result<OptimizationResult, LlmError> {
        let (system, user) =
            build_optimization_messages(self.language(), content, analysis);
        let reply = self.invoke(&system, &user)?;
        parse_optimization(&reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let with_body = LlmError::Transport {
            status: Some(401),
            message: "invalid key".to_string(),
        };
        assert_eq!(
            with_body.to_string(),
            "API request failed with status 401: invalid key"
        );

        let bare = LlmError::Transport {
            status: Some(503),
            message: String::new(),
        };
        assert_eq!(bare.to_string(), "API request failed with status 503");

        let network = LlmError::Transport {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(network.to_string(), "API request failed: connection refused");
        assert_eq!(network.status(), None);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(LlmError::Configuration(String::new()).kind(), "configuration");
        assert_eq!(LlmError::ResponseFormat(String::new()).kind(), "response_format");
        assert_eq!(
            LlmError::Transport {
                status: Some(500),
                message: String::new()
            }
            .kind(),
            "transport"
        );
    }

    #[test]
    fn rating_bands() {
        let with_score = |score| OptimizationResult {
            score,
            strengths: vec![],
            weaknesses: vec![],
            suggestions: vec![],
            optimized_version: String::new(),
        };
        assert_eq!(with_score(100).rating(), "excellent");
        assert_eq!(with_score(80).rating(), "excellent");
        assert_eq!(with_score(79).rating(), "good");
        assert_eq!(with_score(60).rating(), "good");
        assert_eq!(with_score(59).rating(), "fair");
        assert_eq!(with_score(40).rating(), "fair");
        assert_eq!(with_score(39).rating(), "poor");
        assert_eq!(with_score(0).rating(), "poor");
    }

    #[test]
    fn results_serialize_camel_case() {
        let analysis = FeatureAnalysisResult {
            high_features: vec!["a".to_string()],
            low_features: vec![],
            key_differences: vec![],
            recommendations: vec![],
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["highFeatures"][0], "a");
        assert!(json.get("keyDifferences").is_some());
    }
}
