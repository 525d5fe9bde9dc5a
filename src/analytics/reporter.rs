//! Activity reporter: per-operation aggregation for `convopt stats`.

use std::collections::HashMap;

use serde::Serialize;

use crate::analytics::events::{LlmEvent, Operation};

/// Aggregated statistics for one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationStat {
    pub operation: Operation,
    pub count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub avg_latency_ms: f64,
    /// Average score over successful optimizations (optimize only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_score: Option<f64>,
    /// Failure counts by error kind.
    pub failures_by_kind: Vec<(String, usize)>,
}

impl OperationStat {
    pub fn success_pct(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.count as f64) * 100.0
        }
    }
}

/// Summary statistics for `convopt stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_calls: usize,
    pub operations: Vec<OperationStat>,
}

/// Aggregate entries by operation, in a fixed operation order.
pub fn build_stats(entries: &[LlmEvent]) -> Stats {
    let mut groups: HashMap<Operation, Vec<&LlmEvent>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.operation).or_default().push(entry);
    }

    let operations = [
        Operation::Analyze,
        Operation::Optimize,
        Operation::TestConnection,
    ]
    .into_iter()
    .filter_map(|op| groups.get(&op).map(|group| operation_stat(op, group)))
    .collect();

    Stats {
        total_calls: entries.len(),
        operations,
    }
}

fn operation_stat(operation: Operation, group: &[&LlmEvent]) -> OperationStat {
    let count = group.len();
    let succeeded = group.iter().filter(|e| e.success).count();
    let avg_latency_ms = group.iter().map(|e| e.latency_ms as f64).sum::<f64>() / count as f64;

    let scores: Vec<f64> = group
        .iter()
        .filter_map(|e| e.score.map(f64::from))
        .collect();
    let avg_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    let mut kinds: HashMap<&str, usize> = HashMap::new();
    for e in group.iter().filter(|e| !e.success) {
        *kinds
            .entry(e.error_kind.as_deref().unwrap_or("unknown"))
            .or_default() += 1;
    }
    let mut failures_by_kind: Vec<(String, usize)> = kinds
        .into_iter()
        .map(|(k, c)| (k.to_string(), c))
        .collect();
    failures_by_kind.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    OperationStat {
        operation,
        count,
        succeeded,
        failed: count - succeeded,
        avg_latency_ms,
        avg_score,
        failures_by_kind,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    fn entries() -> Vec<LlmEvent> {
        let unauthorized = LlmError::Transport {
            status: Some(401),
            message: String::new(),
        };
        let garbled = LlmError::ResponseFormat(String::new());
        vec![
            LlmEvent::new(Operation::Analyze, "m", 1000),
            LlmEvent::new(Operation::Analyze, "m", 3000).failed(&unauthorized),
            LlmEvent::new(Operation::Optimize, "m", 500).with_score(80),
            LlmEvent::new(Operation::Optimize, "m", 700).with_score(60),
            LlmEvent::new(Operation::Optimize, "m", 900).failed(&garbled),
        ]
    }

    #[test]
    fn groups_by_operation_in_fixed_order() {
        let stats = build_stats(&entries());
        assert_eq!(stats.total_calls, 5);
        assert_eq!(stats.operations.len(), 2);
        assert_eq!(stats.operations[0].operation, Operation::Analyze);
        assert_eq!(stats.operations[1].operation, Operation::Optimize);
    }

    #[test]
    fn computes_rates_latency_and_scores() {
        let stats = build_stats(&entries());
        let analyze = &stats.operations[0];
        assert_eq!(analyze.count, 2);
        assert_eq!(analyze.failed, 1);
        assert!((analyze.avg_latency_ms - 2000.0).abs() < f64::EPSILON);
        assert!((analyze.success_pct() - 50.0).abs() < f64::EPSILON);
        assert_eq!(analyze.avg_score, None);
        assert_eq!(analyze.failures_by_kind, vec![("transport".to_string(), 1)]);

        let optimize = &stats.operations[1];
        assert_eq!(optimize.succeeded, 2);
        assert_eq!(optimize.avg_score, Some(70.0));
    }

    #[test]
    fn empty_entries() {
        let stats = build_stats(&[]);
        assert_eq!(stats.total_calls, 0);
        assert!(stats.operations.is_empty());
    }
}
