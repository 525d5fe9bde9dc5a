//! Activity log: one JSONL line per LLM operation.
//!
//! Records what was asked of the model, how long it took, and how it ended.
//! Used by `convopt stats` and handy when a provider starts misbehaving.
//!
//! Log file: `~/.convopt/events.jsonl`

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::llm::LlmError;

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

/// Which operation produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Analyze,
    Optimize,
    TestConnection,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyze => write!(f, "analyze"),
            Self::Optimize => write!(f, "optimize"),
            Self::TestConnection => write!(f, "test_connection"),
        }
    }
}

/// A single activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmEvent {
    pub timestamp: String,
    pub operation: Operation,
    pub model: String,
    pub success: bool,
    pub latency_ms: u64,
    /// HTTP status of a failed request, when there was one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,
    /// [`LlmError::kind`] of the failure.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_kind: Option<String>,
    /// Score of a successful optimization.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<u8>,
}

impl LlmEvent {
    /// Build an entry stamped with the current time.
    pub fn new(operation: Operation, model: &str, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            operation,
            model: model.to_string(),
            success: true,
            latency_ms,
            status: None,
            error_kind: None,
            score: None,
        }
    }

    /// Mark the entry as failed with `err`.
    pub fn failed(mut self, err: &LlmError) -> Self {
        self.success = false;
        self.status = err.status();
        self.error_kind = Some(err.kind().to_string());
        self
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score);
        self
    }
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Where events go. A disabled log drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Log to `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Log to `~/.convopt/events.jsonl`.
    pub fn default_location() -> Self {
        Self {
            path: events_log_path(),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Append one event. Best-effort: failures are silently ignored.
    pub fn record(&self, event: &LlmEvent) {
        let _ = self.append(event);
    }

    /// Read every entry, skipping malformed lines.
    ///
    /// Returns an empty vec if logging is disabled or the file is missing.
    pub fn read_all(&self) -> Vec<LlmEvent> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<LlmEvent>(&line).ok())
            .collect()
    }

    /// Entries from the last `days` days (all entries if `None`).
    pub fn read_since_days(&self, days: Option<u32>) -> Vec<LlmEvent> {
        let entries = self.read_all();
        let Some(days) = days else {
            return entries;
        };

        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();
        entries
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect()
    }

    fn append(&self, event: &LlmEvent) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(event)?;
        writeln!(file, "{json}")?;

        Ok(())
    }
}

/// Path to the activity log.
pub fn events_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".convopt").join("events.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
