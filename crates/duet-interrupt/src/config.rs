use serde::{Deserialize, Serialize};

/// What the pipeline does when a barge-in fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BargeInAction {
    /// Clear synthesis, cancel generation, start listening.
    StopAndListen,
    /// Same as stop-and-listen, plus a short acknowledgement spoken
    /// through the synthesizer priority lane.
    StopAndAcknowledge { phrase: String },
    /// Reduce playback gain but keep speaking. Best effort.
    DuckAndContinue { gain: f32 },
    /// Detect but take no action.
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BargeInConfig {
    /// VAD probability required while agent audio plays. Higher than the
    /// turn-taking threshold so echo and noise do not trip it.
    pub threshold: f32,
    /// Frames quieter than this never count as interruption speech.
    pub energy_floor_db: f32,
    /// Speech must persist this long before the event fires.
    pub min_speech_ms: u64,
    /// After one event, no re-trigger for this long.
    pub cooldown_ms: u64,
    /// Ignore candidate speech this long after playback starts, when echo
    /// of the agent's own onset is most likely.
    pub grace_ms: u64,
    pub action: BargeInAction,
}

impl Default for BargeInConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            energy_floor_db: -40.0,
            min_speech_ms: 150,
            cooldown_ms: 1_000,
            grace_ms: 200,
            action: BargeInAction::StopAndListen,
        }
    }
}
