use crate::error::Stage;

/// Tracks consecutive failures for one component and decides when the
/// session should drop that component into degraded mode.
///
/// A success resets the streak. Crossing the limit latches: once degraded,
/// the component stays degraded for the rest of the session.
#[derive(Debug)]
pub struct FailureBudget {
    stage: Stage,
    limit: u32,
    consecutive: u32,
    degraded: bool,
}

impl FailureBudget {
    pub fn new(stage: Stage, limit: u32) -> Self {
        Self {
            stage,
            limit,
            consecutive: 0,
            degraded: false,
        }
    }

    /// Records a failure. Returns true exactly once, on the call that
    /// crosses the limit.
    pub fn record_failure(&mut self) -> bool {
        if self.degraded {
            return false;
        }
        self.consecutive += 1;
        if self.consecutive >= self.limit {
            self.degraded = true;
            tracing::warn!(
                target: "pipeline",
                stage = %self.stage,
                consecutive = self.consecutive,
                "component entering degraded mode"
            );
            return true;
        }
        false
    }

    pub fn record_success(&mut self) {
        if !self.degraded {
            self.consecutive = 0;
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrades_after_limit() {
        let mut budget = FailureBudget::new(Stage::Vad, 3);
        assert!(!budget.record_failure());
        assert!(!budget.record_failure());
        assert!(budget.record_failure());
        assert!(budget.is_degraded());
    }

    #[test]
    fn success_resets_streak() {
        let mut budget = FailureBudget::new(Stage::Vad, 3);
        budget.record_failure();
        budget.record_failure();
        budget.record_success();
        assert!(!budget.record_failure());
        assert!(!budget.is_degraded());
    }

    #[test]
    fn degraded_latches_and_fires_once() {
        let mut budget = FailureBudget::new(Stage::Stt, 2);
        budget.record_failure();
        assert!(budget.record_failure());
        assert!(!budget.record_failure());
        budget.record_success();
        assert!(budget.is_degraded());
    }
}
