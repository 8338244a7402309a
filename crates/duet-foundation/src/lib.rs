pub mod error;
pub mod failure;

pub use error::{InferenceError, PipelineError, RecoveryStrategy, Stage};
pub use failure::FailureBudget;
