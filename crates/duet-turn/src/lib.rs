pub mod config;
pub mod detector;
pub mod language;
pub mod semantic;

pub use config::TurnConfig;
pub use detector::{AssessReason, TurnAssessment, TurnDetector, TurnVerdict};
pub use language::LanguageProfile;
pub use semantic::{Completeness, HeuristicEvaluator, SemanticEvaluator};
