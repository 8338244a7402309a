use serde::{Deserialize, Serialize};

use duet_interrupt::BargeInConfig;
use duet_respond::ResponseConfig;
use duet_stt::SttConfig;
use duet_tts::TtsConfig;
use duet_turn::TurnConfig;
use duet_vad::VadConfig;

/// Aggregated per-component configuration for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub vad: VadConfig,
    pub turn: TurnConfig,
    pub stt: SttConfig,
    pub respond: ResponseConfig,
    pub tts: TtsConfig,
    pub barge_in: BargeInConfig,
    /// Depth of the outbound event channel.
    pub event_capacity: usize,
    /// Agent audio frames released per pipeline step, pacing playback
    /// against the input frame cadence.
    pub output_frames_per_step: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            turn: TurnConfig::default(),
            stt: SttConfig::default(),
            respond: ResponseConfig::default(),
            tts: TtsConfig::default(),
            barge_in: BargeInConfig::default(),
            event_capacity: 256,
            output_frames_per_step: 2,
        }
    }
}
