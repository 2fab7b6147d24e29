//! Cost-tracking decorator (spec §4.2, SPEC_FULL §4.14): accumulates totals
//! by model key across every dispatch, independent of any single mission's
//! `Stats`. The Mission Controller folds per-dispatch deltas into the
//! Mission's own `Stats` as each call returns; this tracker is the
//! process-wide view across missions.

use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelTotals {
    pub calls: u64,
    pub cost: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub native_tokens: u64,
}

#[derive(Default)]
pub struct CostTracker {
    totals: RwLock<HashMap<String, ModelTotals>>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one dispatch's usage details into the running total for
    /// `model_key` (conventionally `"{provider}:{model}"`).
    pub fn record(
        &self,
        model_key: impl Into<String>,
        cost: f64,
        prompt_tokens: u64,
        completion_tokens: u64,
        native_tokens: u64,
    ) {
        let mut totals = self.totals.write();
        let entry = totals.entry(model_key.into()).or_default();
        entry.calls += 1;
        entry.cost += cost;
        entry.prompt_tokens += prompt_tokens;
        entry.completion_tokens += completion_tokens;
        entry.native_tokens += native_tokens;
    }

    /// Snapshot of all accumulated totals, keyed by model.
    pub fn snapshot(&self) -> HashMap<String, ModelTotals> {
        self.totals.read().clone()
    }

    pub fn total_cost(&self) -> f64 {
        self.totals.read().values().map(|t| t.cost).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_multiple_calls_to_same_model() {
        let tracker = CostTracker::new();
        tracker.record("openrouter:gpt", 0.01, 100, 50, 150);
        tracker.record("openrouter:gpt", 0.02, 200, 75, 275);
        let snapshot = tracker.snapshot();
        let totals = snapshot.get("openrouter:gpt").unwrap();
        assert_eq!(totals.calls, 2);
        assert!((totals.cost - 0.03).abs() < 1e-9);
        assert_eq!(totals.prompt_tokens, 300);
    }

    #[test]
    fn tracks_distinct_models_separately() {
        let tracker = CostTracker::new();
        tracker.record("openrouter:fast", 0.01, 10, 5, 15);
        tracker.record("openrouter:intelligent", 0.05, 100, 50, 150);
        assert_eq!(tracker.snapshot().len(), 2);
        assert!((tracker.total_cost() - 0.06).abs() < 1e-9);
    }
}
