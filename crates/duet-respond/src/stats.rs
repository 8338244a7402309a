use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Welford running mean/variance, numerically stable over long sessions.
#[derive(Debug, Default)]
pub struct RunningMean {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningMean {
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Per-generator strategy counters, shared across concurrent drivers.
#[derive(Debug, Default)]
pub struct StrategyStats {
    pub fast_wins: AtomicU64,
    pub slow_wins: AtomicU64,
    pub escalations: AtomicU64,
    pub drafts: AtomicU64,
    pub cancellations: AtomicU64,
    /// Time to first token, ms.
    pub ttft_ms: Mutex<RunningMean>,
    /// Accepted fraction of each verified draft span.
    pub draft_acceptance: Mutex<RunningMean>,
    /// Wall time of each slow-model verify call, ms. Watch this against
    /// draft span length; verification that costs as much as generation
    /// erases the strategy's advantage.
    pub verify_overhead_ms: Mutex<RunningMean>,
}

impl StrategyStats {
    pub fn record_ttft(&self, ms: f64) {
        self.ttft_ms.lock().record(ms);
    }

    pub fn record_escalation(&self) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_win(&self, fast: bool) {
        if fast {
            self.fast_wins.fetch_add(1, Ordering::Relaxed);
        } else {
            self.slow_wins.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_draft(&self, accepted: usize, span: usize, verify_ms: f64) {
        self.drafts.fetch_add(1, Ordering::Relaxed);
        if span > 0 {
            self.draft_acceptance
                .lock()
                .record(accepted as f64 / span as f64);
        }
        self.verify_overhead_ms.lock().record(verify_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_arithmetic_mean() {
        let mut mean = RunningMean::default();
        for value in [10.0, 20.0, 30.0, 40.0] {
            mean.record(value);
        }
        assert!((mean.mean() - 25.0).abs() < 1e-9);
        assert_eq!(mean.count(), 4);
        assert!(mean.variance() > 0.0);
    }

    #[test]
    fn acceptance_rate_is_fractional() {
        let stats = StrategyStats::default();
        stats.record_draft(6, 8, 2.0);
        stats.record_draft(8, 8, 2.0);
        let mean = stats.draft_acceptance.lock().mean();
        assert!((mean - 0.875).abs() < 1e-9);
    }
}
