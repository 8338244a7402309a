use std::time::Duration;
use thiserror::Error;

/// Pipeline stages, used for error attribution and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vad,
    Turn,
    Stt,
    Respond,
    Synth,
    Interrupt,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Vad => "vad",
            Stage::Turn => "turn",
            Stage::Stt => "stt",
            Stage::Respond => "respond",
            Stage::Synth => "synth",
            Stage::Interrupt => "interrupt",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Stage {stage} exceeded its {budget:?} budget")]
    Timeout { stage: Stage, budget: Duration },

    #[error("Queue full at stage {stage}, dropped {dropped} item(s)")]
    QueueFull { stage: Stage, dropped: usize },

    #[error("Component {stage} degraded after {consecutive} consecutive failures")]
    Degraded { stage: Stage, consecutive: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// A single failed call into a neural component. Always recoverable at the
/// session level.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("VAD inference failed: {0}")]
    Vad(String),

    #[error("Semantic evaluator failed: {0}")]
    Semantic(String),

    #[error("Decoder failed: {0}")]
    Decode(String),

    #[error("Response model failed: {0}")]
    Generation(String),

    #[error("Synthesis backend failed: {0}")]
    Synthesis(String),
}

impl InferenceError {
    pub fn stage(&self) -> Stage {
        match self {
            InferenceError::Vad(_) => Stage::Vad,
            InferenceError::Semantic(_) => Stage::Turn,
            InferenceError::Decode(_) => Stage::Stt,
            InferenceError::Generation(_) => Stage::Respond,
            InferenceError::Synthesis(_) => Stage::Synth,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback { to: String },
    Degrade,
    Ignore,
    Fatal,
}

impl PipelineError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            PipelineError::Inference(_) => RecoveryStrategy::Retry {
                max_attempts: 1,
                delay: Duration::ZERO,
            },
            PipelineError::Timeout { .. } => RecoveryStrategy::Fallback {
                to: "configured fallback path".into(),
            },
            PipelineError::QueueFull { .. } => RecoveryStrategy::Ignore,
            PipelineError::Degraded { .. } => RecoveryStrategy::Degrade,
            PipelineError::Config(_) | PipelineError::Fatal(_) | PipelineError::SessionClosed => {
                RecoveryStrategy::Fatal
            }
        }
    }
}
