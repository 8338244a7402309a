use duet_audio::AudioFrame;

pub use crate::config::BargeInAction;
use crate::config::BargeInConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptState {
    Idle,
    AgentSpeaking,
    UserInterrupting,
}

/// Emitted once per detected interruption.
#[derive(Debug, Clone)]
pub struct BargeInEvent {
    /// Detector stream time when the event fired.
    pub timestamp_ms: u64,
    /// How long the interrupting speech had persisted.
    pub speech_ms: u64,
    /// Probability of the frame that crossed the duration requirement.
    pub probability: f32,
    pub action: BargeInAction,
}

/// Watches VAD-annotated input frames during playback and fires a
/// [`BargeInEvent`] when the user genuinely talks over the agent.
///
/// Time advances with observed frame durations, not the wall clock, so
/// behavior is deterministic for a given frame sequence.
pub struct BargeInDetector {
    config: BargeInConfig,
    state: InterruptState,
    clock_ms: u64,
    playback_started_ms: u64,
    speech_run_ms: u64,
    last_event_ms: Option<u64>,
    events_fired: u64,
}

impl BargeInDetector {
    pub fn new(config: BargeInConfig) -> Self {
        Self {
            config,
            state: InterruptState::Idle,
            clock_ms: 0,
            playback_started_ms: 0,
            speech_run_ms: 0,
            last_event_ms: None,
            events_fired: 0,
        }
    }

    pub fn state(&self) -> InterruptState {
        self.state
    }

    pub fn events_fired(&self) -> u64 {
        self.events_fired
    }

    /// Playback began; watching starts after the grace period.
    pub fn agent_started_speaking(&mut self) {
        self.state = InterruptState::AgentSpeaking;
        self.playback_started_ms = self.clock_ms;
        self.speech_run_ms = 0;
    }

    /// Playback ended naturally, or the pipeline has handled an
    /// interruption and is listening again.
    pub fn agent_stopped_speaking(&mut self) {
        self.state = InterruptState::Idle;
        self.speech_run_ms = 0;
    }

    /// Observe one VAD-annotated input frame. Returns an event when an
    /// interruption is confirmed.
    pub fn observe_frame(&mut self, frame: &AudioFrame) -> Option<BargeInEvent> {
        self.clock_ms += frame.duration_ms();

        if self.state != InterruptState::AgentSpeaking {
            return None;
        }
        if self.clock_ms < self.playback_started_ms + self.config.grace_ms {
            return None;
        }
        if let Some(last) = self.last_event_ms {
            if self.clock_ms < last + self.config.cooldown_ms {
                return None;
            }
        }

        let probability = frame.vad_probability.unwrap_or(0.0);
        let loud_enough = frame.energy_db >= self.config.energy_floor_db;

        if probability >= self.config.threshold && loud_enough {
            self.speech_run_ms += frame.duration_ms();
            if self.speech_run_ms >= self.config.min_speech_ms {
                return Some(self.fire(probability));
            }
        } else {
            // Persistence requirement: any non-speech frame resets the run.
            self.speech_run_ms = 0;
        }
        None
    }

    fn fire(&mut self, probability: f32) -> BargeInEvent {
        self.events_fired += 1;
        self.last_event_ms = Some(self.clock_ms);
        let speech_ms = self.speech_run_ms;
        self.speech_run_ms = 0;

        // Duck and ignore leave the agent speaking; the stopping actions
        // hand the floor to the user.
        match self.config.action {
            BargeInAction::StopAndListen | BargeInAction::StopAndAcknowledge { .. } => {
                self.state = InterruptState::UserInterrupting;
            }
            BargeInAction::DuckAndContinue { .. } | BargeInAction::Ignore => {}
        }

        tracing::info!(
            target: "interrupt",
            at_ms = self.clock_ms,
            speech_ms,
            probability,
            "barge-in detected"
        );

        BargeInEvent {
            timestamp_ms: self.clock_ms,
            speech_ms,
            probability,
            action: self.config.action.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 10ms frames at 16kHz.
    fn speech_frame() -> AudioFrame {
        AudioFrame::new(vec![0.1; 160], 16_000, 1, 0).annotated(0.9, true)
    }

    fn silence_frame() -> AudioFrame {
        AudioFrame::new(vec![0.0005; 160], 16_000, 1, 0).annotated(0.05, false)
    }

    /// High VAD probability but quiet, like acoustic echo leakage.
    fn echo_frame() -> AudioFrame {
        AudioFrame::new(vec![0.0005; 160], 16_000, 1, 0).annotated(0.9, true)
    }

    fn detector() -> BargeInDetector {
        BargeInDetector::new(BargeInConfig::default())
    }

    fn run_past_grace(det: &mut BargeInDetector) {
        // Default grace is 200ms of frames.
        for _ in 0..20 {
            assert!(det.observe_frame(&silence_frame()).is_none());
        }
    }

    #[test]
    fn sustained_speech_fires_after_min_duration() {
        let mut det = detector();
        det.agent_started_speaking();
        run_past_grace(&mut det);

        let mut event = None;
        let mut frames = 0;
        for _ in 0..30 {
            frames += 1;
            if let Some(e) = det.observe_frame(&speech_frame()) {
                event = Some(e);
                break;
            }
        }
        let event = event.expect("barge-in should fire");
        // 150ms minimum at 10ms frames.
        assert_eq!(frames, 15);
        assert!(event.speech_ms >= 150);
        assert_eq!(det.state(), InterruptState::UserInterrupting);
    }

    #[test]
    fn short_blip_does_not_fire() {
        let mut det = detector();
        det.agent_started_speaking();
        run_past_grace(&mut det);

        for _ in 0..5 {
            assert!(det.observe_frame(&speech_frame()).is_none());
        }
        assert!(det.observe_frame(&silence_frame()).is_none());
        // The run reset; five more speech frames still stay below minimum.
        for _ in 0..5 {
            assert!(det.observe_frame(&speech_frame()).is_none());
        }
        assert_eq!(det.state(), InterruptState::AgentSpeaking);
    }

    #[test]
    fn grace_period_suppresses_playback_onset() {
        let mut det = detector();
        det.agent_started_speaking();
        // Speech during the whole grace window is ignored entirely.
        for _ in 0..20 {
            assert!(det.observe_frame(&speech_frame()).is_none());
        }
        assert_eq!(det.state(), InterruptState::AgentSpeaking);
    }

    #[test]
    fn quiet_echo_never_fires_despite_high_probability() {
        let mut det = detector();
        det.agent_started_speaking();
        run_past_grace(&mut det);
        for _ in 0..50 {
            assert!(det.observe_frame(&echo_frame()).is_none());
        }
    }

    #[test]
    fn cooldown_blocks_retrigger() {
        let mut det = BargeInDetector::new(BargeInConfig {
            action: BargeInAction::DuckAndContinue { gain: 0.3 },
            ..Default::default()
        });
        det.agent_started_speaking();
        run_past_grace(&mut det);

        let mut fired = 0;
        // 500ms of continuous speech: one event, the rest in cooldown.
        for _ in 0..50 {
            if det.observe_frame(&speech_frame()).is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        // Ducking keeps the agent speaking.
        assert_eq!(det.state(), InterruptState::AgentSpeaking);
    }

    #[test]
    fn idle_detector_ignores_speech() {
        let mut det = detector();
        for _ in 0..50 {
            assert!(det.observe_frame(&speech_frame()).is_none());
        }
        assert_eq!(det.state(), InterruptState::Idle);
        assert_eq!(det.events_fired(), 0);
    }

    #[test]
    fn acknowledge_action_carries_phrase() {
        let mut det = BargeInDetector::new(BargeInConfig {
            action: BargeInAction::StopAndAcknowledge {
                phrase: "go ahead".into(),
            },
            ..Default::default()
        });
        det.agent_started_speaking();
        run_past_grace(&mut det);

        let mut event = None;
        for _ in 0..30 {
            if let Some(e) = det.observe_frame(&speech_frame()) {
                event = Some(e);
                break;
            }
        }
        match event.expect("should fire").action {
            BargeInAction::StopAndAcknowledge { phrase } => assert_eq!(phrase, "go ahead"),
            other => panic!("unexpected action {:?}", other),
        }
    }
}
