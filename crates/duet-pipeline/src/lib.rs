//! Session orchestration: wires VAD, turn detection, recognition, response
//! generation, synthesis and barge-in watching into one duplex voice
//! pipeline behind an ordered event stream.

pub mod config;
pub mod dialogue;
pub mod event;
pub mod session;

pub use config::PipelineConfig;
pub use dialogue::{ConversationTurn, DialogueHandle};
pub use event::PipelineEvent;
pub use session::{Session, SessionHandles};
