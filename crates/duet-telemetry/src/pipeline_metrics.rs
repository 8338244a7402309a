use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-stage latency slots, ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageLatency {
    Vad,
    Turn,
    SttFirstPartial,
    GeneratorFirstToken,
    SynthFirstAudio,
    EndToEnd,
}

/// Shared metrics for cross-task pipeline monitoring. Cheap to clone, all
/// slots atomic.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Frame counters
    pub frames_in: Arc<AtomicU64>,
    pub frames_out: Arc<AtomicU64>,
    pub input_fps: Arc<AtomicU64>, // frames per second * 10

    // Activity
    pub is_speaking: Arc<AtomicBool>,
    pub agent_speaking: Arc<AtomicBool>,
    pub last_speech_time: Arc<RwLock<Option<Instant>>>,
    pub speech_segments: Arc<AtomicU64>,
    pub turns_completed: Arc<AtomicU64>,

    // Latency, worst observed per slot, ms
    pub vad_latency_ms: Arc<AtomicU64>,
    pub turn_latency_ms: Arc<AtomicU64>,
    pub stt_first_partial_ms: Arc<AtomicU64>,
    pub generator_first_token_ms: Arc<AtomicU64>,
    pub synth_first_audio_ms: Arc<AtomicU64>,
    pub end_to_end_ms: Arc<AtomicU64>,

    // Interruption and failure tracking
    pub barge_ins: Arc<AtomicU64>,
    pub vad_errors: Arc<AtomicU64>,
    pub stt_errors: Arc<AtomicU64>,
    pub synth_errors: Arc<AtomicU64>,
    pub degraded_components: Arc<AtomicU64>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            frames_in: Arc::new(AtomicU64::new(0)),
            frames_out: Arc::new(AtomicU64::new(0)),
            input_fps: Arc::new(AtomicU64::new(0)),

            is_speaking: Arc::new(AtomicBool::new(false)),
            agent_speaking: Arc::new(AtomicBool::new(false)),
            last_speech_time: Arc::new(RwLock::new(None)),
            speech_segments: Arc::new(AtomicU64::new(0)),
            turns_completed: Arc::new(AtomicU64::new(0)),

            vad_latency_ms: Arc::new(AtomicU64::new(0)),
            turn_latency_ms: Arc::new(AtomicU64::new(0)),
            stt_first_partial_ms: Arc::new(AtomicU64::new(0)),
            generator_first_token_ms: Arc::new(AtomicU64::new(0)),
            synth_first_audio_ms: Arc::new(AtomicU64::new(0)),
            end_to_end_ms: Arc::new(AtomicU64::new(0)),

            barge_ins: Arc::new(AtomicU64::new(0)),
            vad_errors: Arc::new(AtomicU64::new(0)),
            stt_errors: Arc::new(AtomicU64::new(0)),
            synth_errors: Arc::new(AtomicU64::new(0)),
            degraded_components: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl PipelineMetrics {
    pub fn record_frame_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_out(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_input_fps(&self, fps: f64) {
        self.input_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn set_speaking(&self, speaking: bool) {
        let was = self.is_speaking.swap(speaking, Ordering::Relaxed);
        if speaking && !was {
            self.speech_segments.fetch_add(1, Ordering::Relaxed);
            *self.last_speech_time.write() = Some(Instant::now());
        }
    }

    pub fn record_barge_in(&self) {
        self.barge_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_turn_completed(&self) {
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degradation(&self) {
        self.degraded_components.fetch_add(1, Ordering::Relaxed);
    }

    /// Keep the worst latency seen for the slot.
    pub fn record_latency(&self, slot: StageLatency, latency_ms: u64) {
        let cell = match slot {
            StageLatency::Vad => &self.vad_latency_ms,
            StageLatency::Turn => &self.turn_latency_ms,
            StageLatency::SttFirstPartial => &self.stt_first_partial_ms,
            StageLatency::GeneratorFirstToken => &self.generator_first_token_ms,
            StageLatency::SynthFirstAudio => &self.synth_first_audio_ms,
            StageLatency::EndToEnd => &self.end_to_end_ms,
        };
        cell.fetch_max(latency_ms, Ordering::Relaxed);
    }
}
