//! Response generation with bounded worst-case time to first token.
//!
//! Four interchangeable strategies sit behind [`ResponseGenerator`]:
//! sequential, race-parallel, small-first with adaptive escalation, and
//! draft-verify. All of them stream [`TokenChunk`]s through the same
//! [`ResponseStream`] handle and cancel cleanly mid-stream.

pub mod complexity;
pub mod config;
pub mod generator;
pub mod model;
pub mod stats;
pub mod stream;

pub use complexity::ComplexityEstimator;
pub use config::{ResponseConfig, StrategyKind};
pub use generator::ResponseGenerator;
pub use model::{GenerationRequest, ModelTier, ResponseModel, TokenChunk};
pub use stats::{RunningMean, StrategyStats};
pub use stream::{ResponseStream, TokenPoll};
