use std::time::Instant;

/// Sliding-window frame-rate tracker for the input stream.
pub struct FpsTracker {
    window: Vec<Instant>,
    max_samples: usize,
}

impl FpsTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            window: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        self.window.push(now);
        if self.window.len() > self.max_samples {
            self.window.remove(0);
        }
        self.fps()
    }

    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.window.first(), self.window.last()) else {
            return 0.0;
        };
        let span = last.duration_since(*first).as_secs_f64();
        if span <= 0.0 || self.window.len() < 2 {
            return 0.0;
        }
        (self.window.len() - 1) as f64 / span
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn reports_zero_until_two_samples() {
        let mut tracker = FpsTracker::new(10);
        assert_eq!(tracker.tick(), 0.0);
    }

    #[test]
    fn approximates_tick_rate() {
        let mut tracker = FpsTracker::new(10);
        for _ in 0..5 {
            tracker.tick();
            sleep(Duration::from_millis(10));
        }
        let fps = tracker.fps();
        assert!(fps > 20.0 && fps < 200.0, "got {}", fps);
    }
}
