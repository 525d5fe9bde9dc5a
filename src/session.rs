//! Session: the shell around the LLM operations.
//!
//! Holds the current feature analysis in memory only (it is never persisted
//! and is lost when the process exits), enforces the preconditions of both
//! operations, and writes one activity-log entry per call.
//!
//! The session owns no client. Callers build an [`LlmClient`] from the
//! stored configuration for each operation so configuration edits take
//! effect immediately.

use std::time::Instant;

use crate::analytics::{EventLog, LlmEvent, Operation};
use crate::llm::{FeatureAnalysisResult, LlmClient, LlmError, OptimizationResult, Transport};
use crate::samples::{ContentSample, Label, LabelCounts};

/// Refusals and failures of a session operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error(
        "add at least one high-converting and one low-converting sample first \
         (have {high} high, {low} low)"
    )]
    MissingSamples { high: usize, low: usize },

    #[error("enter the copy to optimize")]
    EmptyContent,

    #[error("run a feature analysis first")]
    NoAnalysis,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl WorkflowError {
    /// Stable machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSamples { .. } => "missing_samples",
            Self::EmptyContent => "empty_content",
            Self::NoAnalysis => "no_analysis",
            Self::Llm(e) => e.kind(),
        }
    }
}

/// Split `samples` by label, refusing unless both labels are present.
pub fn partition_for_analysis(
    samples: &[ContentSample],
) -> Result<(Vec<ContentSample>, Vec<ContentSample>), WorkflowError> {
    let counts = LabelCounts::of(samples);
    if !counts.ready_for_analysis() {
        return Err(WorkflowError::MissingSamples {
            high: counts.high,
            low: counts.low,
        });
    }

    Ok(samples
        .iter()
        .cloned()
        .partition(|s| s.label == Label::High))
}

/// In-memory state of one interactive session.
#[derive(Debug, Default)]
pub struct Session {
    analysis: Option<FeatureAnalysisResult>,
    events: EventLog,
}

impl Session {
    pub fn new(events: EventLog) -> Self {
        Self {
            analysis: None,
            events,
        }
    }

    /// The last successful analysis, if any.
    pub fn analysis(&self) -> Option<&FeatureAnalysisResult> {
        self.analysis.as_ref()
    }

    /// Install an analysis obtained elsewhere (e.g. a file saved by the user).
    pub fn set_analysis(&mut self, analysis: FeatureAnalysisResult) {
        self.analysis = Some(analysis);
    }

    /// Run a feature analysis over `samples` and keep the result.
    ///
    /// On failure the previous analysis (if any) is left untouched.
    pub fn analyze<T: Transport>(
        &mut self,
        client: &LlmClient<T>,
        samples: &[ContentSample],
    ) -> Result<&FeatureAnalysisResult, WorkflowError> {
        let (high, low) = partition_for_analysis(samples)?;

        let start = Instant::now();
        let result = client.analyze_features(&high, &low);
        let event = LlmEvent::new(Operation::Analyze, client.model_name(), elapsed_ms(start));

        match result {
            Ok(analysis) => {
                self.events.record(&event);
                Ok(&*self.analysis.insert(analysis))
            }
            Err(e) => {
                self.events.record(&event.failed(&e));
                Err(e.into())
            }
        }
    }

    /// Score and rewrite `content` against the current analysis.
    pub fn optimize<T: Transport>(
        &self,
        client: &LlmClient<T>,
        content: &str,
    ) -> Result<OptimizationResult, WorkflowError> {
        if content.trim().is_empty() {
            return Err(WorkflowError::EmptyContent);
        }
        let analysis = self.analysis.as_ref().ok_or(WorkflowError::NoAnalysis)?;

        let start = Instant::now();
        let result = client.optimize_content(content, analysis);
        let event = LlmEvent::new(Operation::Optimize, client.model_name(), elapsed_ms(start));

        match result {
            Ok(optimization) => {
                self.events.record(&event.with_score(optimization.score));
                Ok(optimization)
            }
            Err(e) => {
                self.events.record(&event.failed(&e));
                Err(e.into())
            }
        }
    }

    /// Check the endpoint with a tiny request.
    pub fn test_connection<T: Transport>(&self, client: &LlmClient<T>) -> Result<(), LlmError> {
        let start = Instant::now();
        let result = client.test_connection();
        let event = LlmEvent::new(
            Operation::TestConnection,
            client.model_name(),
            elapsed_ms(start),
        );

        match &result {
            Ok(()) => self.events.record(&event),
            Err(e) => self.events.record(&event.failed(e)),
        }
        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::llm::ApiConfiguration;

    /// Replays one canned body and counts requests.
    struct Canned {
        body: String,
        calls: Cell<usize>,
    }

    impl Canned {
        fn content(content: &str) -> Self {
            Self {
                body: serde_json::json!({ "choices": [{ "message": { "content": content } }] })
                    .to_string(),
                calls: Cell::new(0),
            }
        }
    }

    impl Transport for Canned {
        fn post_json(&self, _: &str, _: &str, _: &serde_json::Value) -> Result<String, LlmError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.body.clone())
        }
    }

    fn config() -> ApiConfiguration {
        ApiConfiguration {
            api_key: "sk-test".to_string(),
            ..ApiConfiguration::default()
        }
    }

    fn sample(id: &str, label: Label) -> ContentSample {
        ContentSample {
            id: id.to_string(),
            content: format!("copy {id}"),
            label,
            created_at: 0,
        }
    }

    const ANALYSIS: &str = r#"{"highFeatures":["a"],"lowFeatures":["b"],"keyDifferences":["c"],"recommendations":["d"]}"#;

    #[test]
    fn analysis_requires_both_labels() {
        let transport = Canned::content(ANALYSIS);
        let client = LlmClient::with_transport(&config(), &transport);
        let mut session = Session::default();

        let only_high = vec![sample("1", Label::High), sample("2", Label::High)];
        let err = session.analyze(&client, &only_high).unwrap_err();
        assert_eq!(err, WorkflowError::MissingSamples { high: 2, low: 0 });

        let err = session.analyze(&client, &[]).unwrap_err();
        assert_eq!(err.kind(), "missing_samples");

        assert_eq!(transport.calls.get(), 0);
        assert!(session.analysis().is_none());
    }

    #[test]
    fn analysis_is_kept_in_memory() {
        let transport = Canned::content(ANALYSIS);
        let client = LlmClient::with_transport(&config(), &transport);
        let mut session = Session::default();

        let samples = vec![sample("1", Label::Low), sample("2", Label::High)];
        let analysis = session.analyze(&client, &samples).unwrap().clone();
        assert_eq!(analysis.high_features, vec!["a"]);
        assert_eq!(session.analysis(), Some(&analysis));
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn failed_analysis_keeps_previous_result() {
        let good = Canned::content(ANALYSIS);
        let bad = Canned::content("I cannot answer in JSON.");
        let samples = vec![sample("1", Label::Low), sample("2", Label::High)];
        let mut session = Session::default();

        session
            .analyze(&LlmClient::with_transport(&config(), &good), &samples)
            .unwrap();
        let err = session
            .analyze(&LlmClient::with_transport(&config(), &bad), &samples)
            .unwrap_err();
        assert_eq!(err.kind(), "response_format");
        assert!(session.analysis().is_some());
    }

    #[test]
    fn optimize_requires_analysis_and_content() {
        let transport = Canned::content("{}");
        let client = LlmClient::with_transport(&config(), &transport);
        let mut session = Session::default();

        assert_eq!(
            session.optimize(&client, "Buy now").unwrap_err(),
            WorkflowError::NoAnalysis
        );

        session.set_analysis(FeatureAnalysisResult {
            high_features: vec![],
            low_features: vec![],
            key_differences: vec![],
            recommendations: vec![],
        });
        assert_eq!(
            session.optimize(&client, "  ").unwrap_err(),
            WorkflowError::EmptyContent
        );
        assert_eq!(transport.calls.get(), 0);
    }

    #[test]
    fn optimize_returns_typed_result() {
        let transport = Canned::content(
            r#"{"score":88,"strengths":["s"],"weaknesses":["w"],"suggestions":["g"],"optimizedVersion":"v"}"#,
        );
        let client = LlmClient::with_transport(&config(), &transport);
        let mut session = Session::default();
        session.set_analysis(serde_json::from_str(ANALYSIS).unwrap());

        let result = session.optimize(&client, "Buy now").unwrap();
        assert_eq!(result.score, 88);
        assert_eq!(result.optimized_version, "v");
    }

    #[test]
    fn missing_key_surfaces_as_configuration_error() {
        let transport = Canned::content(ANALYSIS);
        let client = LlmClient::with_transport(&ApiConfiguration::default(), &transport);
        let mut session = Session::default();
        let samples = vec![sample("1", Label::Low), sample("2", Label::High)];

        let err = session.analyze(&client, &samples).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert_eq!(transport.calls.get(), 0);
    }

    #[test]
    fn operations_are_logged() {
        let path = std::env::temp_dir().join(format!(
            "convopt-session-events-{}.jsonl",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let transport = Canned::content(ANALYSIS);
        let client = LlmClient::with_transport(&config(), &transport);
        let mut session = Session::new(EventLog::at(&path));
        let samples = vec![sample("1", Label::Low), sample("2", Label::High)];
        session.analyze(&client, &samples).unwrap();
        // Reply is an analysis, not an optimization, so this one fails.
        let _ = session.optimize(&client, "Buy now");

        let events = EventLog::at(&path).read_all();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, Operation::Analyze);
        assert!(events[0].success);
        assert_eq!(events[1].operation, Operation::Optimize);
        assert_eq!(events[1].error_kind.as_deref(), Some("response_format"));

        let _ = std::fs::remove_file(&path);
    }
}
