use crate::config::VadConfig;
use crate::types::{VadEvent, VadState};

/// Debounced speech/silence state machine driven by per-frame candidate
/// decisions.
///
/// A run of speech frames must persist for the speech debounce before a
/// `SpeechStart` event commits; a shorter run is a false alarm and is
/// discarded without a trace. Symmetrically, silence must persist for the
/// silence debounce before `SpeechEnd` commits, so mid-utterance pauses do
/// not split a segment.
pub struct VadStateMachine {
    state: VadState,
    speech_frames: u32,
    silence_frames: u32,
    speech_debounce_frames: u32,
    silence_debounce_frames: u32,
    frame_duration_ms: f32,
    speech_padding_ms: u32,
    max_speech_frames: Option<u64>,
    /// Frame index where the current provisional or committed speech run
    /// began.
    onset_frame: u64,
    frames_since_start: u64,
}

impl VadStateMachine {
    pub fn new(config: &VadConfig) -> Self {
        let frame_duration_ms = config.frame_duration_ms();
        Self {
            state: VadState::Silence,
            speech_frames: 0,
            silence_frames: 0,
            speech_debounce_frames: config.speech_debounce_frames().max(1),
            silence_debounce_frames: config.silence_debounce_frames().max(1),
            frame_duration_ms,
            speech_padding_ms: config.speech_padding_ms,
            max_speech_frames: config
                .max_speech_duration_ms
                .map(|ms| (ms as f32 / frame_duration_ms).ceil() as u64),
            onset_frame: 0,
            frames_since_start: 0,
        }
    }

    pub fn process(&mut self, is_speech_candidate: bool, energy_db: f32) -> Option<VadEvent> {
        self.frames_since_start += 1;

        match self.state {
            VadState::Silence => {
                if is_speech_candidate {
                    self.state = VadState::SpeechStart;
                    self.onset_frame = self.frames_since_start - 1;
                    self.speech_frames = 1;
                    self.maybe_commit_speech(energy_db)
                } else {
                    None
                }
            }

            VadState::SpeechStart => {
                if is_speech_candidate {
                    self.speech_frames += 1;
                    self.maybe_commit_speech(energy_db)
                } else {
                    // False alarm: discard the accumulated run entirely.
                    self.state = VadState::Silence;
                    self.speech_frames = 0;
                    None
                }
            }

            VadState::Speech => {
                if let Some(event) = self.maybe_force_max_duration(energy_db) {
                    return Some(event);
                }
                if !is_speech_candidate {
                    self.state = VadState::SpeechEnd;
                    self.silence_frames = 1;
                    self.maybe_commit_silence(energy_db)
                } else {
                    None
                }
            }

            VadState::SpeechEnd => {
                if is_speech_candidate {
                    // Speech resumed inside the debounce window.
                    self.state = VadState::Speech;
                    self.silence_frames = 0;
                    None
                } else {
                    self.silence_frames += 1;
                    self.maybe_commit_silence(energy_db)
                }
            }
        }
    }

    fn maybe_commit_speech(&mut self, energy_db: f32) -> Option<VadEvent> {
        if self.speech_frames < self.speech_debounce_frames {
            return None;
        }
        self.state = VadState::Speech;
        self.speech_frames = 0;
        let onset_ms = self.frame_to_ms(self.onset_frame);
        Some(VadEvent::SpeechStart {
            timestamp_ms: onset_ms.saturating_sub(self.speech_padding_ms as u64),
            energy_db,
        })
    }

    fn maybe_commit_silence(&mut self, energy_db: f32) -> Option<VadEvent> {
        if self.silence_frames < self.silence_debounce_frames {
            return None;
        }
        self.state = VadState::Silence;
        self.silence_frames = 0;
        Some(self.end_event(energy_db))
    }

    fn maybe_force_max_duration(&mut self, energy_db: f32) -> Option<VadEvent> {
        let max = self.max_speech_frames?;
        if self.frames_since_start - self.onset_frame >= max {
            self.state = VadState::Silence;
            self.speech_frames = 0;
            self.silence_frames = 0;
            return Some(self.end_event(energy_db));
        }
        None
    }

    fn end_event(&self, energy_db: f32) -> VadEvent {
        let now_ms = self.frame_to_ms(self.frames_since_start);
        let onset_ms = self.frame_to_ms(self.onset_frame);
        VadEvent::SpeechEnd {
            timestamp_ms: now_ms,
            duration_ms: now_ms.saturating_sub(onset_ms).max(1),
            energy_db,
        }
    }

    /// Immediately close any active speech segment, e.g. after barge-in.
    pub fn force_end(&mut self, energy_db: f32) -> Option<VadEvent> {
        match self.state {
            VadState::Speech | VadState::SpeechEnd => {
                let event = self.end_event(energy_db);
                self.state = VadState::Silence;
                self.speech_frames = 0;
                self.silence_frames = 0;
                Some(event)
            }
            _ => {
                self.state = VadState::Silence;
                self.speech_frames = 0;
                self.silence_frames = 0;
                None
            }
        }
    }

    pub fn current_state(&self) -> VadState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = VadState::Silence;
        self.speech_frames = 0;
        self.silence_frames = 0;
        self.onset_frame = 0;
        self.frames_since_start = 0;
    }

    fn frame_to_ms(&self, frame: u64) -> u64 {
        (frame as f32 * self.frame_duration_ms) as u64
    }
}
