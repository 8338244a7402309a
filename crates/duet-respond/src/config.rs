use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single slow-model call. Simplest, worst latency tail.
    Sequential,
    /// Fast and slow run concurrently, first token wins, loser aborted.
    RaceParallel,
    /// Fast model first, slow takes over on timeout or high complexity.
    SmallFirstEscalate,
    /// Fast model drafts spans, slow model verifies prefixes.
    DraftVerify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    pub strategy: StrategyKind,
    /// Token channel depth between driver and consumer.
    pub channel_capacity: usize,
    /// End-to-end budget the first token must fit inside.
    pub budget_ms: u64,
    /// Worst-case first-token time granted to the slow model after an
    /// escalation. The adaptive timeout always leaves at least this much.
    pub slow_first_token_allowance_ms: u64,
    pub base_timeout_ms: u64,
    /// Per-input-char growth of the adaptive timeout. Longer queries earn
    /// the fast model more time.
    pub per_char_timeout_ms: f32,
    pub min_timeout_ms: u64,
    /// Complexity score at or above which the fast path is skipped or
    /// abandoned.
    pub complexity_threshold: f32,
    /// Tokens per draft span in draft-verify.
    pub draft_span: usize,
    pub max_response_tokens: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::SmallFirstEscalate,
            channel_capacity: 32,
            budget_ms: 800,
            slow_first_token_allowance_ms: 300,
            base_timeout_ms: 80,
            per_char_timeout_ms: 1.0,
            min_timeout_ms: 50,
            complexity_threshold: 0.65,
            draft_span: 8,
            max_response_tokens: 256,
        }
    }
}

impl ResponseConfig {
    /// Per-request fast-model deadline. Scales with input length so short
    /// queries fail over early, and is capped so the slow model always has
    /// its first-token allowance left inside the budget. A fixed timeout
    /// here produces the latency cliff this avoids: short-but-hard queries
    /// would burn the whole wait before the fallback even starts.
    pub fn adaptive_timeout(&self, input_chars: usize) -> Duration {
        let scaled = self.base_timeout_ms as f32 + self.per_char_timeout_ms * input_chars as f32;
        let cap = self.budget_ms.saturating_sub(self.slow_first_token_allowance_ms);
        let ms = (scaled as u64).clamp(self.min_timeout_ms.min(cap), cap);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_timeout_scales_with_input() {
        let config = ResponseConfig::default();
        assert!(config.adaptive_timeout(10) < config.adaptive_timeout(200));
    }

    #[test]
    fn adaptive_timeout_leaves_slow_model_allowance() {
        let config = ResponseConfig::default();
        for chars in [0, 10, 100, 1_000, 100_000] {
            let timeout = config.adaptive_timeout(chars);
            assert!(
                timeout.as_millis() as u64 + config.slow_first_token_allowance_ms
                    <= config.budget_ms,
                "timeout {:?} breaks budget at {} chars",
                timeout,
                chars
            );
        }
    }

    #[test]
    fn adaptive_timeout_has_floor() {
        let config = ResponseConfig::default();
        assert!(config.adaptive_timeout(0).as_millis() as u64 >= config.min_timeout_ms);
    }
}
