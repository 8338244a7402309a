use duet_audio::AudioFrame;
use duet_foundation::Stage;
use duet_interrupt::BargeInEvent;
use duet_stt::TranscriptResult;

/// Ordered event stream emitted to the dialogue/orchestration collaborator.
///
/// Closed set: consumers match exhaustively so a new event kind is a
/// compile-visible change everywhere it must be handled.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    SpeechStart {
        timestamp_ms: u64,
    },
    /// Partial or final recognition result, see
    /// [`TranscriptResult::is_final`].
    Transcript(TranscriptResult),
    SpeechEnd {
        timestamp_ms: u64,
        duration_ms: u64,
    },
    BargeIn(BargeInEvent),
    /// One frame of synthesized agent audio for playback.
    AgentAudio(AudioFrame),
    AgentSpeechEnd,
    /// Non-fatal problem; the session stays alive.
    Error {
        stage: Stage,
        message: String,
    },
}
