pub mod backend;
pub mod config;
pub mod guards;
pub mod recognizer;
pub mod types;

pub use backend::{DecodedToken, DecoderBackend, Hypothesis};
pub use config::SttConfig;
pub use recognizer::StreamingRecognizer;
pub use types::{SttMetrics, TranscriptResult, WordSpan};
