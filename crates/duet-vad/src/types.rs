/// Debounced VAD state, owned exclusively by one session's detector.
///
/// `SpeechStart` and `SpeechEnd` are the provisional edges: speech (or
/// silence) observed but not yet held long enough to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence,
    SpeechStart,
    Speech,
    SpeechEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    SpeechStart {
        timestamp_ms: u64,
        energy_db: f32,
    },
    SpeechEnd {
        timestamp_ms: u64,
        duration_ms: u64,
        energy_db: f32,
    },
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct VadUpdate {
    pub state: VadState,
    pub probability: f32,
    pub event: Option<VadEvent>,
    /// Set on the single update where the detector crossed into degraded
    /// mode (neural engine abandoned for the energy heuristic).
    pub degraded_now: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VadMetrics {
    pub frames_processed: u64,
    pub speech_segments: u64,
    pub total_speech_ms: u64,
    pub total_silence_ms: u64,
    pub inference_failures: u64,
    pub energy_short_circuits: u64,
    pub last_energy_db: f32,
}
