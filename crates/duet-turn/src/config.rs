use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Below this silence the turn is never considered ended.
    pub min_silence_ms: u64,
    /// At or above this silence the turn is unconditionally ended.
    pub max_silence_ms: u64,
    /// Weighted-confidence threshold for a semantic turn end.
    pub semantic_threshold: f32,
    /// Hard cap on how long a wait phrase can hold the turn open.
    pub wait_cap_ms: u64,
    /// Confidence reported by the punctuation fallback.
    pub fallback_confidence: f32,
    /// Blend weights for silence ratio vs semantic confidence.
    pub silence_weight: f32,
    pub semantic_weight: f32,
    /// Number of recent classifications smoothed over.
    pub smoothing_window: usize,
    /// Wall-clock budget for one evaluator call; overruns fall back to
    /// punctuation.
    pub evaluator_budget_ms: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            min_silence_ms: 300,
            max_silence_ms: 1_000,
            semantic_threshold: 0.7,
            wait_cap_ms: 10_000,
            fallback_confidence: 0.8,
            silence_weight: 0.4,
            semantic_weight: 0.6,
            smoothing_window: 5,
            evaluator_budget_ms: 50,
        }
    }
}
