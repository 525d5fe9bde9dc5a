//! Sample manager: the labeled copy samples the analysis is built from.
//!
//! The manager owns the store and an in-memory copy of the collection. Every
//! add/remove rewrites the whole collection through the persistence adapter
//! immediately; there is no dirty state to flush.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{self, KeyValueStore};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Observed conversion tier of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    High,
    Low,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "low" | "l" => Ok(Self::Low),
            other => Err(format!("unknown label '{other}' (expected 'high' or 'low')")),
        }
    }
}

/// One piece of historical ad copy.
///
/// Stored as `{"id","content","type","timestamp"}`, with `timestamp` in
/// epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSample {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub label: Label,
    #[serde(rename = "timestamp")]
    pub created_at: i64,
}

impl ContentSample {
    /// Creation time as a UTC datetime.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Running per-label totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub high: usize,
    pub low: usize,
}

impl LabelCounts {
    /// Count the labels in a slice of samples.
    pub fn of(samples: &[ContentSample]) -> Self {
        samples.iter().fold(Self::default(), |mut acc, s| {
            match s.label {
                Label::High => acc.high += 1,
                Label::Low => acc.low += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.high + self.low
    }

    /// Whether at least one sample of each label exists.
    pub fn ready_for_analysis(&self) -> bool {
        self.high > 0 && self.low > 0
    }
}

/// Sample mutations that were refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("sample content must not be blank")]
    BlankContent,

    #[error("no sample with id '{0}'")]
    NotFound(String),
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// CRUD over the persisted sample collection.
#[derive(Debug)]
pub struct SampleManager<S> {
    store: S,
    samples: Vec<ContentSample>,
}

impl<S: KeyValueStore> SampleManager<S> {
    /// Load the collection from `store` (empty if missing or corrupt).
    pub fn open(store: S) -> Self {
        let samples = storage::load_samples(&store);
        Self { store, samples }
    }

    /// All samples in insertion order.
    pub fn samples(&self) -> &[ContentSample] {
        &self.samples
    }

    /// Samples with the given label, in insertion order.
    pub fn by_label(&self, label: Label) -> Vec<ContentSample> {
        self.samples
            .iter()
            .filter(|s| s.label == label)
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> LabelCounts {
        LabelCounts::of(&self.samples)
    }

    /// Append a sample and persist the collection.
    ///
    /// Content is trimmed; blank content is refused. Duplicates are allowed.
    pub fn add(&mut self, content: &str, label: Label) -> Result<&ContentSample, SampleError> {
        self.insert(content, label, Utc::now().timestamp_millis())
    }

    /// Remove the sample with `id` and persist the collection.
    pub fn remove(&mut self, id: &str) -> Result<ContentSample, SampleError> {
        let pos = self
            .samples
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SampleError::NotFound(id.to_string()))?;
        let removed = self.samples.remove(pos);
        storage::save_samples(&mut self.store, &self.samples);
        Ok(removed)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn insert(
        &mut self,
        content: &str,
        label: Label,
        now_ms: i64,
    ) -> Result<&ContentSample, SampleError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SampleError::BlankContent);
        }

        let sample = ContentSample {
            id: self.next_id(now_ms),
            content: content.to_string(),
            label,
            created_at: now_ms,
        };
        self.samples.push(sample);
        storage::save_samples(&mut self.store, &self.samples);

        let idx = self.samples.len() - 1;
        Ok(&self.samples[idx])
    }

    /// Time-based id, bumped past any id already taken.
    fn next_id(&self, now_ms: i64) -> String {
        let mut candidate = now_ms;
        loop {
            let id = candidate.to_string();
            if !self.samples.iter().any(|s| s.id == id) {
                return id;
            }
            candidate += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
